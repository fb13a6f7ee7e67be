use crate::core::aggregate::{count_by_postal_code, filter_by_threshold};
use crate::core::input::{read_records, DEFAULT_LOCATION_COLUMN};
use crate::core::location::ParsedLocation;
use crate::core::render::MapRenderer;
use crate::core::report::write_csv;
use crate::core::{Geocoder, Pipeline, Record, ReportPaths, RunParameters, Storage, TransformResult};
use crate::utils::error::Result;

/// Parse → aggregate → geocode → render → write, for one set of parameters.
pub struct BubbleMapPipeline<S: Storage, G: Geocoder> {
    pub(crate) storage: S,
    pub(crate) geocoder: G,
    pub(crate) renderer: MapRenderer,
    pub(crate) params: RunParameters,
    location_column: String,
}

impl<S: Storage, G: Geocoder> BubbleMapPipeline<S, G> {
    pub fn new(storage: S, geocoder: G, params: RunParameters) -> Self {
        Self {
            storage,
            geocoder,
            renderer: MapRenderer::default(),
            params,
            location_column: DEFAULT_LOCATION_COLUMN.to_string(),
        }
    }

    pub fn with_renderer(mut self, renderer: MapRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_location_column(mut self, column: impl Into<String>) -> Self {
        self.location_column = column.into();
        self
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: Geocoder> Pipeline for BubbleMapPipeline<S, G> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading input from: {}", self.params.input);
        let bytes = self.storage.read_file(&self.params.input).await?;
        let records = read_records(&bytes, &self.location_column)?;
        tracing::debug!("Read {} bytes, {} records", bytes.len(), records.len());
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let total_records = data.len();
        let parsed: Vec<ParsedLocation> = data
            .iter()
            .map(|record| ParsedLocation::from_location(&record.location))
            .collect();

        let aggregation = count_by_postal_code(&parsed);
        if aggregation.skipped > 0 {
            tracing::warn!(
                "⚠️ {} records had no postal code and were skipped",
                aggregation.skipped
            );
        }

        let statistics = aggregation.statistics();
        if let Some(stats) = &statistics {
            tracing::info!(
                "📊 {} postal codes, mean {:.2}, median {}, mode {}",
                aggregation.rows.len(),
                stats.mean,
                stats.median_label(),
                stats.mode
            );
        }

        let mut aggregates = filter_by_threshold(aggregation.rows, self.params.min_count);
        tracing::info!(
            "{} postal codes with at least {} cases",
            aggregates.len(),
            self.params.min_count
        );

        // 逐筆查詢，失敗的列座標保留 NaN
        for row in aggregates.iter_mut() {
            match self.geocoder.lookup(&row.postal_code).await {
                Ok(Some(point)) => row.set_coordinates(Some(point)),
                Ok(None) => {
                    tracing::info!("No geocoding match for {}", row.postal_code);
                    row.set_coordinates(None);
                }
                Err(e) => {
                    tracing::warn!("❌ Geocoding {} failed: {}", row.postal_code, e);
                    row.set_coordinates(None);
                }
            }
        }

        Ok(TransformResult {
            aggregates,
            statistics,
            total_records,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<ReportPaths> {
        let html = self
            .renderer
            .render(&self.params, &result.aggregates, result.statistics.as_ref());
        let csv = write_csv(&result.aggregates)?;

        tracing::debug!("Writing CSV ({} bytes) to {}", csv.len(), self.params.output_csv);
        self.storage.write_file(&self.params.output_csv, &csv).await?;

        tracing::debug!("Writing HTML ({} bytes) to {}", html.len(), self.params.output_html);
        self.storage
            .write_file(&self.params.output_html, html.as_bytes())
            .await?;

        Ok(ReportPaths {
            csv: self.params.output_csv.clone(),
            html: self.params.output_html.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LatLon;
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_input(path: &str, data: &[u8]) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), data.to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| EtlError::NotFoundError {
                path: path.to_string(),
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    /// Fixed answers per postal code; unknown codes fail like a broken service.
    struct MockGeocoder {
        answers: HashMap<String, Option<LatLon>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockGeocoder {
        fn new(answers: &[(&str, Option<LatLon>)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(code, point)| (code.to_string(), *point))
                    .collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn lookup(&self, postal_code: &str) -> Result<Option<LatLon>> {
            self.calls.lock().await.push(postal_code.to_string());
            self.answers
                .get(postal_code)
                .copied()
                .ok_or_else(|| EtlError::HttpStatusError {
                    url: "mock".to_string(),
                    status: 503,
                })
        }
    }

    fn params(min_count: i64) -> RunParameters {
        RunParameters {
            input: "cases.csv".to_string(),
            output_csv: "out/report.csv".to_string(),
            output_html: "out/report.html".to_string(),
            prefix: "NSL".to_string(),
            month: "Mar".to_string(),
            year: "2024".to_string(),
            min_count,
        }
    }

    const INPUT: &[u8] = b"Case ID,Case Location\n\
        1,BLK123456001\n\
        2,BLK123456001\n\
        3,BLK456789002\n\
        4,BLK123456001\n\
        5,BLK7\n\
        6,BLK222760221\n\
        7,BLK222760221\n";

    #[tokio::test]
    async fn test_extract_reads_location_column() {
        let storage = MockStorage::with_input("cases.csv", INPUT);
        let pipeline = BubbleMapPipeline::new(storage, MockGeocoder::new(&[]), params(1));

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(records[4].location, "BLK7");
    }

    #[tokio::test]
    async fn test_extract_missing_input() {
        let storage = MockStorage::with_input("other.csv", INPUT);
        let pipeline = BubbleMapPipeline::new(storage, MockGeocoder::new(&[]), params(1));

        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::NotFoundError { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_filters_and_geocodes_in_row_order() {
        let storage = MockStorage::with_input("cases.csv", INPUT);
        let geocoder = MockGeocoder::new(&[
            ("456001", Some(LatLon::new(1.43, 103.84))),
            ("760221", None),
        ]);
        let calls = geocoder.calls.clone();
        let pipeline = BubbleMapPipeline::new(storage, geocoder, params(2));

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.total_records, 7);
        assert_eq!(result.aggregates.len(), 2);
        assert_eq!(result.aggregates[0].postal_code, "456001");
        assert_eq!(result.aggregates[0].coordinates(), Some(LatLon::new(1.43, 103.84)));
        assert_eq!(result.aggregates[1].postal_code, "760221");
        assert!(result.aggregates[1].coordinates().is_none());
        assert_eq!(result.resolved_count(), 1);

        // statistics cover the unfiltered distribution [3, 2, 1]
        let stats = result.statistics.unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.mode, 3);

        assert_eq!(*calls.lock().await, vec!["456001", "760221"]);
    }

    #[tokio::test]
    async fn test_short_row_is_skipped_not_fatal() {
        let input = b"Case ID,Remarks,Case Location\n\
            1,ok,BLK123456001\n\
            2\n\
            3,ok,BLK123456001\n";
        let storage = MockStorage::with_input("cases.csv", input);
        let geocoder = MockGeocoder::new(&[("456001", Some(LatLon::new(1.43, 103.84)))]);
        let pipeline = BubbleMapPipeline::new(storage, geocoder, params(1));

        let records = pipeline.extract().await.unwrap();
        assert_eq!(records.len(), 3);

        let result = pipeline.transform(records).await.unwrap();
        assert_eq!(result.total_records, 3);
        assert_eq!(result.aggregates.len(), 1);
        assert_eq!(result.aggregates[0].count, 2);
    }

    #[tokio::test]
    async fn test_geocoder_failure_degrades_row_only() {
        let storage = MockStorage::with_input("cases.csv", INPUT);
        // 760221 has no answer, so the mock fails for it
        let geocoder = MockGeocoder::new(&[("456001", Some(LatLon::new(1.43, 103.84)))]);
        let pipeline = BubbleMapPipeline::new(storage, geocoder, params(2));

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        assert_eq!(result.aggregates.len(), 2);
        assert!(result.aggregates[1].latitude.is_nan());
        assert!(result.aggregates[1].longitude.is_nan());
    }

    #[tokio::test]
    async fn test_load_writes_csv_and_html() {
        let storage = MockStorage::with_input("cases.csv", INPUT);
        let geocoder = MockGeocoder::new(&[
            ("456001", Some(LatLon::new(1.43, 103.84))),
            ("760221", None),
        ]);
        let pipeline = BubbleMapPipeline::new(storage.clone(), geocoder, params(2));

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        let paths = pipeline.load(result).await.unwrap();

        assert_eq!(paths.csv, "out/report.csv");
        assert_eq!(paths.html, "out/report.html");

        let csv = String::from_utf8(storage.get_file("out/report.csv").await.unwrap()).unwrap();
        assert_eq!(
            csv,
            "Postal.Code,Count,Block,OnemapLongitude,OnemapLatitude\n\
             456001,3,BLK1,103.84,1.43\n\
             760221,2,BLK2,,\n"
        );

        let html = String::from_utf8(storage.get_file("out/report.html").await.unwrap()).unwrap();
        assert!(html.contains("456001"));
        assert!(!html.contains("760221"));
        assert!(html.contains("<b>NSL Mar 2024</b>"));
    }
}

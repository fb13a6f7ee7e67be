use crate::core::{Pipeline, ReportPaths};
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<ReportPaths> {
        let started = Instant::now();
        tracing::info!("🚀 Starting bubble map run");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} records", raw_data.len());

        // Transform
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🗺️ Geocoded {}/{} postal codes",
            transformed.resolved_count(),
            transformed.aggregates.len()
        );

        // Load
        let paths = self.pipeline.load(transformed).await?;
        tracing::info!(
            "📁 Wrote {} and {} in {:?}",
            paths.csv,
            paths.html,
            started.elapsed()
        );

        Ok(paths)
    }
}

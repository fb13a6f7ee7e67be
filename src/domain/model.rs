use serde::{Deserialize, Serialize};

/// One input row. Only the location field takes part in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub location: String,
}

impl Record {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Latitude/longitude pair. Serialized as `[lat, lon]` in the TOML config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for LatLon {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLon> for [f64; 2] {
    fn from(value: LatLon) -> Self {
        [value.lat, value.lon]
    }
}

/// One row per distinct postal code.
///
/// Coordinates stay `NaN` until the geocoder resolves them; a row that could
/// not be resolved keeps `NaN` for both.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalAggregate {
    pub postal_code: String,
    pub count: u64,
    pub block: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl PostalAggregate {
    pub fn new(postal_code: impl Into<String>, count: u64, block: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            count,
            block: block.into(),
            longitude: f64::NAN,
            latitude: f64::NAN,
        }
    }

    pub fn set_coordinates(&mut self, coordinates: Option<LatLon>) {
        match coordinates {
            Some(point) => {
                self.latitude = point.lat;
                self.longitude = point.lon;
            }
            None => {
                self.latitude = f64::NAN;
                self.longitude = f64::NAN;
            }
        }
    }

    pub fn coordinates(&self) -> Option<LatLon> {
        if self.latitude.is_nan() || self.longitude.is_nan() {
            None
        } else {
            Some(LatLon::new(self.latitude, self.longitude))
        }
    }
}

/// Mean, median and mode of the unfiltered count distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub mode: u64,
    /// Number of counts the statistics were computed over.
    pub sample_size: usize,
}

impl SummaryStatistics {
    /// An even-sized distribution has a midpoint median, always shown with a
    /// decimal part (`2.0`, `2.5`); an odd-sized one shows the middle count.
    pub fn median_label(&self) -> String {
        if self.sample_size % 2 == 0 && self.median.fract() == 0.0 {
            format!("{:.1}", self.median)
        } else {
            format!("{}", self.median)
        }
    }
}

/// Caller-supplied parameters of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub input: String,
    pub output_csv: String,
    pub output_html: String,
    pub prefix: String,
    pub month: String,
    pub year: String,
    pub min_count: i64,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub aggregates: Vec<PostalAggregate>,
    pub statistics: Option<SummaryStatistics>,
    pub total_records: usize,
}

impl TransformResult {
    pub fn resolved_count(&self) -> usize {
        self.aggregates
            .iter()
            .filter(|row| row.coordinates().is_some())
            .count()
    }
}

/// Where the report artifacts of a run were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: String,
    pub html: String,
}

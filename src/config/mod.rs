#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::geocoder::{OneMapGeocoder, ONEMAP_SEARCH_URL};
use crate::core::backoff::BackoffPolicy;
use crate::core::input::DEFAULT_LOCATION_COLUMN;
use crate::core::render::{
    CenterTable, MapRenderer, DEFAULT_ATTRIBUTION, DEFAULT_TILE_URL, DEFAULT_ZOOM,
};
use crate::domain::model::LatLon;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration shared by the CLI and the upload server.
///
/// Every section is optional in the TOML file; missing values fall back to
/// the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: InputConfig,
    pub geocoder: GeocoderConfig,
    pub map: MapConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub location_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            location_column: DEFAULT_LOCATION_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub retry: BackoffPolicy,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: ONEMAP_SEARCH_URL.to_string(),
            timeout_seconds: 30,
            retry: BackoffPolicy::default(),
        }
    }
}

impl GeocoderConfig {
    pub fn build(&self) -> Result<OneMapGeocoder> {
        OneMapGeocoder::new(
            self.endpoint.clone(),
            self.retry.clone(),
            Duration::from_secs(self.timeout_seconds),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom_start: u8,
    pub tile_url: String,
    pub attribution: String,
    pub default_center: LatLon,
    pub centers: BTreeMap<String, LatLon>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom_start: DEFAULT_ZOOM,
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            default_center: CenterTable::BUILTIN_DEFAULT,
            centers: BTreeMap::new(),
        }
    }
}

impl MapConfig {
    /// Built-in centers with `[map.centers]` layered on top; a configured
    /// prefix replaces the built-in entry of the same name.
    pub fn center_table(&self) -> CenterTable {
        let mut centers = CenterTable::builtin_centers();
        centers.extend(self.centers.iter().map(|(prefix, center)| (prefix.clone(), *center)));
        CenterTable::new(centers, self.default_center)
    }

    pub fn renderer(&self) -> MapRenderer {
        MapRenderer::new(
            self.center_table(),
            self.zoom_start,
            self.tile_url.clone(),
            self.attribution.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub upload_dir: String,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            upload_dir: "uploads".to_string(),
            allowed_extensions: vec!["csv".to_string()],
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ReportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Optional file: defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${ONEMAP_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("input.location_column", &self.input.location_column)?;

        validation::validate_url("geocoder.endpoint", &self.geocoder.endpoint)?;
        validation::validate_positive_number(
            "geocoder.timeout_seconds",
            self.geocoder.timeout_seconds as usize,
            1,
        )?;
        validation::validate_positive_number(
            "geocoder.retry.max_attempts",
            self.geocoder.retry.max_attempts as usize,
            1,
        )?;
        if self.geocoder.retry.max_delay_ms < self.geocoder.retry.base_delay_ms {
            return Err(EtlError::InvalidConfigValueError {
                field: "geocoder.retry.max_delay_ms".to_string(),
                value: self.geocoder.retry.max_delay_ms.to_string(),
                reason: "Ceiling cannot be below base_delay_ms".to_string(),
            });
        }

        validation::validate_range("map.zoom_start", self.map.zoom_start, 0, 20)?;
        validation::validate_url("map.tile_url", &self.map.tile_url.replace(['{', '}'], ""))?;
        for (prefix, center) in &self.map.centers {
            validation::validate_range(&format!("map.centers.{}", prefix), center.lat, -90.0, 90.0)?;
            validation::validate_range(&format!("map.centers.{}", prefix), center.lon, -180.0, 180.0)?;
        }

        validation::validate_path("server.upload_dir", &self.server.upload_dir)?;
        validation::validate_non_empty_string("server.bind_address", &self.server.bind_address)?;
        validation::validate_positive_number("server.allowed_extensions", self.server.allowed_extensions.len(), 1)?;
        validation::validate_positive_number("server.max_upload_bytes", self.server.max_upload_bytes, 1)?;

        Ok(())
    }
}

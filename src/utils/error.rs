use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingConfigError { field: String },

    #[error("Input decoding error: {message}")]
    InputDecodeError { message: String },

    #[error("Geocoding failed for postal code {postal_code}: {message}")]
    GeocodeError {
        postal_code: String,
        message: String,
    },

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Report not found: {path}")]
    NotFoundError { path: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Input,
    Configuration,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_)
            | EtlError::GeocodeError { .. }
            | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_) | EtlError::InputDecodeError { .. } => ErrorCategory::Input,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::NotFoundError { .. } => ErrorCategory::Storage,
            EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆地理編碼失敗只會讓該列座標變成 NaN
            EtlError::GeocodeError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EtlError::CsvError(_)
            | EtlError::InputDecodeError { .. }
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. }
            | EtlError::NotFoundError { .. } => ErrorSeverity::High,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the failure should be answered as a client error by the upload server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Input | ErrorCategory::Configuration
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity and the geocoder endpoint, then re-run"
            }
            ErrorCategory::Input => {
                "Make sure the input is a CSV file with a header row and the location column"
            }
            ErrorCategory::Configuration => {
                "Review the command line flags and the TOML configuration file"
            }
            ErrorCategory::Storage => "Check that the paths exist and are writable",
            ErrorCategory::Processing => "Re-run with --verbose and inspect the log output",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::InputDecodeError { message } => {
                format!("The input file could not be read: {}", message)
            }
            EtlError::CsvError(e) => format!("The input file is not valid CSV: {}", e),
            EtlError::MissingConfigError { field } => {
                format!("The required field '{}' was not provided", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("'{}' is invalid: {}", field, reason)
            }
            EtlError::NotFoundError { path } => format!("No report exists at {}", path),
            EtlError::IoError(e) => format!("File system error: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

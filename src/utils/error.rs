use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Spreadsheet error in {file}: {message}")]
    SpreadsheetError { file: String, message: String },

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Unknown {kind}: '{key}'")]
    LookupError { kind: String, key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn lookup(kind: &str, key: impl Into<String>) -> Self {
        EtlError::LookupError {
            kind: kind.to_string(),
            key: key.into(),
        }
    }

    pub fn spreadsheet(file: &str, message: impl std::fmt::Display) -> Self {
        EtlError::SpreadsheetError {
            file: file.to_string(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::HttpError(_) => ErrorCategory::Network,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::SpreadsheetError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. }
            | EtlError::LookupError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常重試即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::HttpError(_) => {
                "Check your network connection and that the NHS England statistics page is reachable, then retry"
            }
            EtlError::CsvError(_) => {
                "Re-run `wardstats transform` to regenerate the staging files"
            }
            EtlError::SpreadsheetError { .. } => {
                "Delete the offending file from data/raw and run `wardstats download --overwrite`"
            }
            EtlError::IoError(_) => "Check that the data directory exists and is writable",
            EtlError::SerializationError(_) => "Check that the GeoJSON boundary file is valid JSON",
            EtlError::TaskError(_) => "Retry with --verbose for more details",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix wardstats.toml and validate it with `wardstats check-config`"
            }
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                "The raw file layout may have changed; check the column mapping in wardstats.toml"
            }
            EtlError::LookupError { .. } => "Use one of the keys listed by /api/options",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not download data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

// Boundary errors: loading exports and reading configuration.
// The engines themselves never fail; numeric edge cases are values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid record {record}: {reason}")]
    InvalidRecord { record: String, reason: String },

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Invalid date '{0}' (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

impl InsightsError {
    pub fn invalid_record(record: impl Into<String>, reason: impl Into<String>) -> Self {
        InsightsError::InvalidRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        InsightsError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;

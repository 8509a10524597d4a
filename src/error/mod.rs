use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid date range: start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("{feature} is not available in this deployment: {reason}")]
    OptionalFeatureUnavailable { feature: String, reason: String },

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Import error: {0}")]
    Import(String),
}

impl Error {
    pub fn platform(msg: impl Into<String>) -> Self {
        Error::Platform(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn import(msg: impl Into<String>) -> Self {
        Error::Import(msg.into())
    }

    pub fn feature_unavailable(feature: impl Into<String>, reason: impl ToString) -> Self {
        Error::OptionalFeatureUnavailable {
            feature: feature.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures a page may absorb by substituting zero.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::OptionalFeatureUnavailable { .. })
    }
}

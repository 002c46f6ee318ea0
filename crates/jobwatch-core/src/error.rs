use thiserror::Error;

/// Application-wide error types for Jobwatch.
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetching a source page failed (network, timeout or HTTP status).
    #[error("Fetch error for {url}: {cause}")]
    FetchError { url: String, cause: String },

    /// The page could not be evaluated against its extraction rule.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// A single extracted record is missing its title or link.
    #[error("Incomplete record: {0}")]
    IncompleteRecord(String),

    /// No job is stored under the given fingerprint.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The requested status is not part of the lifecycle.
    #[error("Invalid status '{0}' (expected one of: new, applied, interviewed, offered, rejected, withdrawn)")]
    InvalidStatus(String),

    /// Handing new jobs to the notifier failed.
    #[error("Notify error: {0}")]
    NotifyError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn fetch(url: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        AppError::FetchError {
            url: url.into(),
            cause: cause.to_string(),
        }
    }
}

//! Error types for the wealth-snapshot library.

/// All errors that can occur when using the wealth-snapshot library.
#[derive(Debug, thiserror::Error)]
pub enum WealthError {
    /// HTTP transport failed.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("api error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or service-provided message.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// A backup document was rejected before any state was touched.
    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    /// A mutation was rejected because its input is out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required credential (user id, API key) was not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// Statement image analysis failed after all retries.
    #[error("statement analysis failed: {0}")]
    Scan(String),

    /// No holding exists with the given identifier.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, WealthError>;

use thiserror::Error;

/// Application-wide error types for leadgen.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page, or a non-2xx answer).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The search provider rejected the query or returned garbage.
    #[error("Search provider error: {0}")]
    SearchProviderError(String),

    /// The spreadsheet endpoint did not accept a forwarded file.
    #[error("Sheet sync error: {0}")]
    SheetError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Local filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A filename that could escape the data directory.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error came from the transport rather than from
    /// the content that was sent or received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::HttpError(_)
        )
    }
}

use thiserror::Error;

/// Application-wide error types for Haven.
///
/// The listing extractor never returns these: data-shape problems in a
/// listing page are reported through diagnostics instead. These cover the
/// I/O collaborators around it.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Search API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Page or payload could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::ApiError { status, .. } => *status == 429 || *status >= 500,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

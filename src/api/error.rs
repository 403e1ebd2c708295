//! API error types for the Redmine client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when interacting with the Redmine API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The response body was not the JSON we expected.
    #[error("Invalid API response: {0}")]
    Parse(#[source] serde_json::Error),

    /// A request payload could not be encoded.
    #[error("Failed to encode request: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Resource not found (HTTP 404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other failure status.
    ///
    /// The message is exactly what the server reported, with multiple
    /// messages joined by newlines.
    #[error("{message}")]
    Service {
        /// The HTTP status the server answered with.
        status: StatusCode,
        /// The joined server-provided messages.
        message: String,
    },

    /// The request failed before a response was received.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Keyring error when storing/retrieving API keys.
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// A local file could not be read for upload.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server kept declaring more items than it returned.
    #[error("Pagination stalled: server declared {total} items but stopped at {fetched}")]
    PaginationStalled {
        /// Items received before the empty page.
        fetched: usize,
        /// The total the server declared.
        total: usize,
    },
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code and the server's messages.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(context.to_string()),
            _ => ApiError::Service {
                status,
                message: context.to_string(),
            },
        }
    }

    /// The HTTP status behind this error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Service { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Whether this is a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

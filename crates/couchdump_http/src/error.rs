//! Error types for the HTTP helper.

use thiserror::Error;

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised when no HTTP response could be obtained.
///
/// A response with an error status is not an `HttpError`; callers inspect
/// [`crate::HttpResponse::status`] themselves.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The underlying client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// Connection, DNS or protocol failure before a response arrived.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// No response within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The redirect limit was exceeded.
    #[error("too many redirects while requesting {url}")]
    TooManyRedirects {
        /// Requested URL.
        url: String,
    },

    /// Response body could not be decoded as the expected JSON shape.
    #[error("invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Creates a transport error for the given URL.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}

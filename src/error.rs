//! Error types for the preview sync client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while syncing a label draft with the backend
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to build the HTTP client or another backing resource
    #[error("Client initialization failed: {0}")]
    InitializationError(String),

    /// Invalid configuration (base URL, label UUID, headers)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Transport-level failure: connection refused, timeout, broken body
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The backend answered with an `{"error": ...}` body
    #[error("{0}")]
    ServerError(String),

    /// The backend answered with a non-success status and no error text
    #[error("Server responded with status {0}")]
    HttpStatus(u16),

    /// A reply or page could not be decoded
    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    /// The background image was rejected before upload
    #[error("Invalid image: {0}")]
    InvalidAsset(String),

    /// An operation needs an uploaded background first
    #[error("Please upload an image first")]
    NotUploaded,

    /// PDF export needs a beer name
    #[error("Please enter a beer name")]
    MissingBeerName,

    /// Local filesystem failure (reading images, writing downloads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DecodeError(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::NetworkError(format!("request timed out: {}", err))
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

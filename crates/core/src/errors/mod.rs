//! Error types and Result alias for the live tournament client

use thiserror::Error;

/// Main error type for the live tournament client
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Push channel unavailable: {0}")]
    PushUnavailable(String),

    #[error("Push stream closed")]
    StreamClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::InvalidData(err.to_string())
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

impl Error {
    /// Whether this error came from the transport rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::NetworkError(_) | Error::Timeout(_) | Error::PushUnavailable(_) | Error::StreamClosed
        )
    }
}

//! Common error types for IMP

use thiserror::Error;

/// Common result type for IMP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across IMP crates
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-level failure (DNS, refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered 401
    #[error("Unauthorized")]
    Unauthorized,

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status from the remote API
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether a single retry is worthwhile.
    ///
    /// Connection failures, timeouts and 5xx responses are transient;
    /// everything else (4xx, decode errors) would fail identically again.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

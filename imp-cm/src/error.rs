//! Error types for imp-cm

use thiserror::Error;

/// Main error type for the campaign manager
#[derive(Error, Debug)]
pub enum Error {
    /// Remote source or configuration failure
    #[error(transparent)]
    Source(#[from] imp_common::Error),

    /// View fetch failed; the message is also on the session error banner
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Operation not valid in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Text for the session's error banner
    pub fn banner_message(&self) -> String {
        match self {
            Error::Source(imp_common::Error::Unauthorized) => {
                "Not authorized to access the contacts API".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience Result type using imp-cm Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the BrickLink client.

use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum BrickLinkError {
    /// One of the four OAuth values is blank.
    #[error("BrickLink OAuth credentials are incomplete")]
    MissingCredentials,

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<BrickLinkError> for PlatformError {
    fn from(err: BrickLinkError) -> Self {
        match err {
            BrickLinkError::MissingCredentials => PlatformError::AuthRequired,
            BrickLinkError::Http(message) => PlatformError::Internal { message },
        }
    }
}

//! Error types for the Keepa client.

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors raised while setting up a Keepa client.
///
/// Errors from individual requests are reported as [`PlatformError`]s.
#[derive(Debug, Error)]
pub enum KeepaError {
    /// No API key was configured.
    #[error("Keepa API key is not configured")]
    MissingKey,

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<KeepaError> for PlatformError {
    fn from(err: KeepaError) -> Self {
        match err {
            KeepaError::MissingKey => PlatformError::AuthRequired,
            KeepaError::Http(message) => PlatformError::Internal { message },
        }
    }
}

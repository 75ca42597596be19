//! Error types for the eBay client.

use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum EbayError {
    #[error("eBay OAuth token is not configured")]
    MissingToken,

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<EbayError> for PlatformError {
    fn from(err: EbayError) -> Self {
        match err {
            EbayError::MissingToken => PlatformError::AuthRequired,
            EbayError::Http(message) => PlatformError::Internal { message },
        }
    }
}

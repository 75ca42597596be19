//! Error types for the Amazon client.

use thiserror::Error;

use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum AmazonError {
    /// No access token was configured.
    #[error("Amazon access token is not configured")]
    MissingToken,

    #[error("HTTP client error: {0}")]
    Http(String),

    /// `getOrderItems` kept returning a `NextToken` past the page limit.
    #[error("order {order} has more than {pages} pages of items")]
    TooManyItemPages { order: String, pages: usize },
}

impl From<AmazonError> for PlatformError {
    fn from(err: AmazonError) -> Self {
        match err {
            AmazonError::MissingToken => PlatformError::AuthRequired,
            AmazonError::Http(message) => PlatformError::Internal { message },
            err @ AmazonError::TooManyItemPages { .. } => PlatformError::Internal {
                message: err.to_string(),
            },
        }
    }
}

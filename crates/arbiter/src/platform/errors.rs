use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to an external source.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// API error from the source.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Source throttled the request. Surfaced to callers only once the
    /// bounded throttle retries are exhausted.
    #[error("Rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Authentication required or failed (invalid or expired credentials).
    #[error("Authentication required")]
    AuthRequired,

    /// One record's shape could not be mapped to a normalized record.
    #[error("Could not normalize record {record}: {message}")]
    Normalization { record: String, message: String },

    /// Source acknowledged the id but returned nothing.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The source does not offer this capability.
    #[error("{source_name} does not support {capability}")]
    Unsupported {
        source_name: String,
        capability: &'static str,
    },

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

impl PlatformError {
    /// Create an API error.
    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a normalization error for one record.
    #[inline]
    pub fn normalization(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Normalization {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an unsupported-capability error.
    #[inline]
    pub fn unsupported(source_name: impl Into<String>, capability: &'static str) -> Self {
        Self::Unsupported {
            source_name: source_name.into(),
            capability,
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a throttling response.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether this error invalidates the whole pass for its source.
    ///
    /// Record-level failures (normalization, not found) and transient
    /// per-call errors are reported individually; throttling that survived
    /// the bounded retries and credential failures abort the pass.
    #[inline]
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::AuthRequired)
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that include backtraces or multi-line details.
///
/// # Example
///
/// ```ignore
/// use arbiter::platform::short_error_message;
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// assert_eq!(short_error_message(&error), "file not found");
/// ```
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

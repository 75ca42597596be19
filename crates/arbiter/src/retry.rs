//! Retry policy for transient persistence failures.
//!
//! Source throttling is handled by [`RateLimitedClient`](crate::platform::RateLimitedClient);
//! this module covers the other retryable boundary: database writes that fail
//! because a lock is held or a connection dropped.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Backoff settings for [`with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Retries after the first failed attempt.
    pub max_retries: usize,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_retries: 3,
            jitter: true,
        }
    }
}

impl RetryConfig {
    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation`, retrying the errors `is_transient` accepts.
///
/// Anything else is returned after the first attempt. `label` names the
/// operation in debug logs.
pub async fn with_retry<T, E, F, Fut, IsTransient>(
    operation: F,
    is_transient: IsTransient,
    config: RetryConfig,
    label: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    IsTransient: Fn(&E) -> bool,
{
    let mut retries = 0u32;
    operation
        .retry(config.backoff())
        .when(is_transient)
        .notify(|err: &E, delay: Duration| {
            retries += 1;
            tracing::debug!(
                operation = label,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient write failure"
            );
        })
        .await
}

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::entity::source::Source;
use crate::sync::{ProgressCallback, SyncProgress, emit};

use super::errors::{PlatformError, Result};
use super::types::{
    Capabilities, CursorPosition, Fetched, LineItem, NormalizedOrder, ObservedListing,
    OrderFilter, OrderPage, PriceSnapshot, RawRecord, SourceAdapter,
};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default budgets per source.
pub mod rate_limits {
    use std::time::Duration;

    /// Keepa refills 20 tokens per minute on the base plan; one token per ASIN.
    pub const KEEPA_REFILL_PER_MINUTE: f64 = 20.0;
    /// Keepa accepts at most this many ASINs per product request.
    pub const KEEPA_MAX_BATCH: usize = 10;
    /// Amazon SP-API orders endpoints, conservatively.
    pub const AMAZON_REFILL_PER_MINUTE: f64 = 30.0;
    pub const EBAY_REFILL_PER_MINUTE: f64 = 60.0;
    pub const BRICKLINK_REFILL_PER_MINUTE: f64 = 60.0;

    /// Minimum spacing between two calls to the same source.
    pub const MIN_CALL_GAP: Duration = Duration::from_secs(2);
    /// Added on top of every computed budget wait.
    pub const SAFETY_MARGIN: Duration = Duration::from_secs(2);
    /// Wait used when a throttling response carries no retry-after value.
    pub const THROTTLE_FALLBACK_WAIT: Duration = Duration::from_secs(60);
    /// Throttling responses retried before giving up on the call.
    pub const MAX_THROTTLE_RETRIES: u32 = 3;
}

/// Budget settings for one source credential.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    /// Bucket size; the bucket starts full.
    pub capacity: f64,
    /// Tokens regained per minute.
    pub refill_per_minute: f64,
    /// Flat cost of any billable call.
    pub cost_per_call: f64,
    /// Additional cost per id in a batch call.
    pub cost_per_id: f64,
    /// Minimum spacing between calls. Zero disables spacing.
    pub min_gap: Duration,
    pub safety_margin: Duration,
    pub throttle_fallback: Duration,
    pub max_throttle_retries: u32,
}

impl BudgetConfig {
    /// Default budget for a source.
    pub fn for_source(source: Source) -> Self {
        let base = Self {
            capacity: rate_limits::AMAZON_REFILL_PER_MINUTE,
            refill_per_minute: rate_limits::AMAZON_REFILL_PER_MINUTE,
            cost_per_call: 1.0,
            cost_per_id: 0.0,
            min_gap: rate_limits::MIN_CALL_GAP,
            safety_margin: rate_limits::SAFETY_MARGIN,
            throttle_fallback: rate_limits::THROTTLE_FALLBACK_WAIT,
            max_throttle_retries: rate_limits::MAX_THROTTLE_RETRIES,
        };

        match source {
            Source::Amazon => base,
            Source::Ebay => Self {
                capacity: rate_limits::EBAY_REFILL_PER_MINUTE,
                refill_per_minute: rate_limits::EBAY_REFILL_PER_MINUTE,
                ..base
            },
            Source::BrickLink => Self {
                capacity: rate_limits::BRICKLINK_REFILL_PER_MINUTE,
                refill_per_minute: rate_limits::BRICKLINK_REFILL_PER_MINUTE,
                ..base
            },
            Source::Keepa => Self {
                capacity: rate_limits::KEEPA_REFILL_PER_MINUTE,
                refill_per_minute: rate_limits::KEEPA_REFILL_PER_MINUTE,
                cost_per_call: 0.0,
                cost_per_id: 1.0,
                ..base
            },
        }
    }

    #[must_use]
    pub fn with_refill_per_minute(mut self, refill: f64) -> Self {
        self.refill_per_minute = refill;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_min_gap(mut self, gap: Duration) -> Self {
        self.min_gap = gap;
        self
    }

    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Token cost of a call carrying `ids` ids.
    pub fn cost(&self, ids: usize) -> f64 {
        self.cost_per_call + self.cost_per_id * ids as f64
    }
}

/// Local estimate of a source's remaining budget.
///
/// The estimate refills continuously at `refill_per_minute` and is
/// overwritten by the source's own figure whenever a response carries one.
#[derive(Debug)]
pub struct TokenBucket {
    tokens_left: f64,
    capacity: f64,
    refill_per_minute: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_minute: f64) -> Self {
        Self {
            tokens_left: capacity,
            capacity,
            refill_per_minute: refill_per_minute.max(f64::EPSILON),
            last_refill: Instant::now(),
        }
    }

    pub fn tokens_left(&self) -> f64 {
        self.tokens_left
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens_left =
            (self.tokens_left + elapsed * self.refill_per_minute / 60.0).min(self.capacity);
        self.last_refill = now;
    }

    /// Time until `cost` tokens are available, rounded up to whole seconds.
    pub fn shortfall_wait(&mut self, cost: f64) -> Option<Duration> {
        self.refill();
        if self.tokens_left >= cost {
            return None;
        }
        let secs = ((cost - self.tokens_left) / self.refill_per_minute * 60.0).ceil();
        Some(Duration::from_secs(secs as u64))
    }

    /// Sleep until the estimate covers `cost`, plus `margin`. Returns the
    /// time slept (zero when the budget was already there).
    pub async fn wait_for_budget(&mut self, cost: f64, margin: Duration) -> Duration {
        match self.shortfall_wait(cost) {
            Some(wait) => {
                let total = wait + margin;
                tokio::time::sleep(total).await;
                self.refill();
                total
            }
            None => Duration::ZERO,
        }
    }

    /// Book a completed call. A reported balance wins over the local estimate.
    pub fn record_call(&mut self, cost: f64, reported: Option<f64>) {
        self.refill();
        self.tokens_left = match reported {
            Some(left) => left,
            None => self.tokens_left - cost,
        };
    }

    /// Drop the estimate to zero after a throttling response.
    pub fn exhaust(&mut self) {
        self.tokens_left = 0.0;
        self.last_refill = Instant::now();
    }
}

/// A budget-enforcing wrapper around any `SourceAdapter`.
///
/// Every billable call first waits for budget, then for the minimum call
/// gap, then runs. Throttling responses are retried up to
/// `max_throttle_retries` times after sleeping the advertised retry-after
/// (or the fallback wait); all other errors propagate untouched.
///
/// # Example
///
/// ```ignore
/// use arbiter::platform::{BudgetConfig, RateLimitedClient};
/// use arbiter::keepa::KeepaAdapter;
///
/// let adapter = KeepaAdapter::new(transport, api_key, domain);
/// let client = RateLimitedClient::new(adapter, BudgetConfig::for_source(Source::Keepa));
/// let records = client.fetch_batch(&asins).await?;
/// ```
pub struct RateLimitedClient<A> {
    inner: A,
    config: BudgetConfig,
    bucket: Arc<Mutex<TokenBucket>>,
    gap: Option<Arc<GovernorRateLimiter>>,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl<A: SourceAdapter> RateLimitedClient<A> {
    /// Create a new rate-limited client wrapper.
    pub fn new(inner: A, config: BudgetConfig) -> Self {
        let gap = Quota::with_period(config.min_gap)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN))));
        let bucket = TokenBucket::new(config.capacity, config.refill_per_minute);

        Self {
            inner,
            config,
            bucket: Arc::new(Mutex::new(bucket)),
            gap,
            on_progress: None,
        }
    }

    /// Report budget waits and throttling backoffs to a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Get a reference to the inner adapter.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Current local estimate of the remaining budget.
    pub async fn tokens_left(&self) -> f64 {
        self.bucket.lock().await.tokens_left()
    }

    /// Block until the bucket covers `cost`. Billable calls made through
    /// this wrapper already do this.
    pub async fn wait_for_budget(&self, cost: f64) {
        let mut bucket = self.bucket.lock().await;
        self.wait_locked(&mut bucket, cost).await;
    }

    async fn wait_locked(&self, bucket: &mut TokenBucket, cost: f64) {
        let tokens_left = bucket.tokens_left();
        let waited = bucket
            .wait_for_budget(cost, self.config.safety_margin)
            .await;
        if !waited.is_zero() {
            tracing::debug!(
                source = %self.inner.source(),
                cost,
                tokens_left,
                waited_ms = waited.as_millis() as u64,
                "Waited for rate-limit budget"
            );
            emit(
                self.on_progress.as_deref(),
                SyncProgress::BudgetWait {
                    source: self.inner.source(),
                    cost,
                    waited_ms: waited.as_millis() as u64,
                },
            );
        }
    }

    /// Run one billable call under the budget and throttle-retry policy.
    ///
    /// The bucket lock is held for the whole call so concurrent callers of
    /// one client are serialized.
    async fn call<T, F, Fut>(&self, cost: f64, op: F) -> Result<Fetched<T>>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<Fetched<T>>> + Send,
        T: Send,
    {
        let mut bucket = self.bucket.lock().await;
        let mut attempt = 0u32;

        loop {
            self.wait_locked(&mut bucket, cost).await;
            if let Some(gap) = &self.gap {
                gap.until_ready().await;
            }

            match op().await {
                Ok(fetched) => {
                    bucket.record_call(cost, fetched.tokens_left);
                    return Ok(fetched);
                }
                Err(PlatformError::RateLimited { retry_after }) => {
                    if attempt >= self.config.max_throttle_retries {
                        tracing::warn!(
                            source = %self.inner.source(),
                            attempts = attempt + 1,
                            "Rate limit retries exhausted"
                        );
                        bucket.exhaust();
                        return Err(PlatformError::RateLimited { retry_after });
                    }
                    attempt += 1;

                    let wait = retry_after.unwrap_or(self.config.throttle_fallback);
                    tracing::warn!(
                        source = %self.inner.source(),
                        attempt,
                        max_retries = self.config.max_throttle_retries,
                        wait_ms = wait.as_millis() as u64,
                        "Throttled by source, backing off"
                    );
                    emit(
                        self.on_progress.as_deref(),
                        SyncProgress::Throttled {
                            source: self.inner.source(),
                            attempt,
                            retry_after_ms: wait.as_millis() as u64,
                        },
                    );

                    bucket.exhaust();
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    // The call most likely still cost budget.
                    bucket.record_call(cost, None);
                    return Err(e);
                }
            }
        }
    }
}

impl<A: Clone> Clone for RateLimitedClient<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            bucket: Arc::clone(&self.bucket),
            gap: self.gap.clone(),
            on_progress: self.on_progress.clone(),
        }
    }
}

#[async_trait]
impl<A: SourceAdapter> SourceAdapter for RateLimitedClient<A> {
    fn source(&self) -> Source {
        self.inner.source()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }

    fn build_incremental_filter(&self, cursor: Option<&CursorPosition>) -> OrderFilter {
        self.inner.build_incremental_filter(cursor)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page_limit: u32,
    ) -> Result<Fetched<OrderPage>> {
        self.call(self.config.cost(0), || {
            self.inner.list_orders(filter, page_limit)
        })
        .await
    }

    fn normalize_order(&self, raw: &RawRecord) -> Result<NormalizedOrder> {
        self.inner.normalize_order(raw)
    }

    async fn fetch_line_items(&self, order: &NormalizedOrder) -> Result<Fetched<Vec<LineItem>>> {
        if order.line_items_loaded {
            return Ok(Fetched::new(order.line_items.clone()));
        }
        self.call(self.config.cost(0), || self.inner.fetch_line_items(order))
            .await
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Fetched<Vec<RawRecord>>> {
        let max = self.inner.max_batch_size();
        if ids.len() > max {
            return Err(PlatformError::internal(format!(
                "batch of {} ids exceeds {} limit of {}",
                ids.len(),
                self.inner.source(),
                max
            )));
        }
        if ids.is_empty() {
            return Ok(Fetched::new(Vec::new()));
        }
        self.call(self.config.cost(ids.len()), || self.inner.fetch_batch(ids))
            .await
    }

    fn normalize_price(&self, raw: &RawRecord) -> Result<PriceSnapshot> {
        self.inner.normalize_price(raw)
    }

    async fn search_listings(&self, query: &str) -> Result<Fetched<Vec<RawRecord>>> {
        self.call(self.config.cost(0), || self.inner.search_listings(query))
            .await
    }

    fn normalize_listing(&self, raw: &RawRecord) -> Result<ObservedListing> {
        self.inner.normalize_listing(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use super::*;

    /// Price source that replays scripted responses and records call times.
    struct ScriptedSource {
        responses: StdMutex<VecDeque<Result<Fetched<Vec<RawRecord>>>>>,
        calls: StdMutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Fetched<Vec<RawRecord>>>>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn ok_forever() -> Self {
            Self::new(Vec::new())
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceAdapter for ScriptedSource {
        fn source(&self) -> Source {
            Source::Keepa
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                prices: true,
                ..Capabilities::NONE
            }
        }

        fn max_batch_size(&self) -> usize {
            10
        }

        async fn fetch_batch(&self, ids: &[String]) -> Result<Fetched<Vec<RawRecord>>> {
            self.calls.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(Fetched::new(
                        ids.iter().map(|id| serde_json::json!({ "asin": id })).collect(),
                    ))
                })
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("B00{i:05}")).collect()
    }

    fn keepa_budget() -> BudgetConfig {
        BudgetConfig::for_source(Source::Keepa)
            .with_capacity(10.0)
            .with_min_gap(Duration::ZERO)
            .with_safety_margin(Duration::ZERO)
    }

    #[test]
    fn test_budget_defaults_per_source() {
        let keepa = BudgetConfig::for_source(Source::Keepa);
        assert_eq!(keepa.refill_per_minute, 20.0);
        assert_eq!(keepa.cost(10), 10.0);
        assert_eq!(keepa.min_gap, Duration::from_secs(2));

        let ebay = BudgetConfig::for_source(Source::Ebay);
        assert_eq!(ebay.refill_per_minute, 60.0);
        assert_eq!(ebay.cost(0), 1.0);
        assert_eq!(ebay.max_throttle_retries, 3);
        assert_eq!(ebay.throttle_fallback, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn token_bucket_shortfall_is_rounded_up() {
        let mut bucket = TokenBucket::new(10.0, 20.0);
        bucket.record_call(9.5, None);
        // 9.5 tokens short at 20/min = 28.5s, rounded up
        assert_eq!(bucket.shortfall_wait(10.0), Some(Duration::from_secs(29)));
        assert_eq!(bucket.shortfall_wait(0.5), None);
    }

    #[tokio::test(start_paused = true)]
    async fn token_bucket_refills_over_time_up_to_capacity() {
        let mut bucket = TokenBucket::new(10.0, 20.0);
        bucket.exhaust();
        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(bucket.shortfall_wait(5.0), None);

        tokio::time::advance(Duration::from_secs(600)).await;
        bucket.refill();
        assert_eq!(bucket.tokens_left(), 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_calls_with_insufficient_budget_without_waiting() {
        let client = RateLimitedClient::new(ScriptedSource::ok_forever(), keepa_budget());

        for _ in 0..4 {
            client.fetch_batch(&ids(10)).await.expect("batch");
        }

        let times = client.inner().call_times();
        assert_eq!(times.len(), 4);
        // A full batch drains the 10-token bucket; refilling 10 tokens at
        // 20/min takes 30s.
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_secs(30));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_with_full_bucket_does_not_wait() {
        let client = RateLimitedClient::new(ScriptedSource::ok_forever(), keepa_budget());
        let start = Instant::now();
        client.fetch_batch(&ids(3)).await.expect("batch");
        assert_eq!(client.inner().call_times()[0], start);
        assert_eq!(client.tokens_left().await, 7.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reported_tokens_left_overrides_local_estimate() {
        let source = ScriptedSource::new(vec![Ok(Fetched::with_tokens(Vec::new(), Some(0.0)))]);
        let client = RateLimitedClient::new(source, keepa_budget().with_capacity(100.0));

        client.fetch_batch(&ids(1)).await.expect("first");
        assert_eq!(client.tokens_left().await, 0.0);

        client.fetch_batch(&ids(2)).await.expect("second");
        let times = client.inner().call_times();
        // 2 tokens at 20/min = 6s
        assert!(times[1].duration_since(times[0]) >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_is_retried_after_advertised_wait() {
        let source = ScriptedSource::new(vec![
            Err(PlatformError::RateLimited {
                retry_after: Some(Duration::from_secs(45)),
            }),
            Err(PlatformError::RateLimited {
                retry_after: Some(Duration::from_secs(45)),
            }),
        ]);
        let client = RateLimitedClient::new(source, keepa_budget());

        let start = Instant::now();
        let fetched = client.fetch_batch(&ids(2)).await.expect("third attempt succeeds");
        assert_eq!(fetched.data.len(), 2);

        let times = client.inner().call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1].duration_since(start) >= Duration::from_secs(45));
        assert!(times[2].duration_since(times[1]) >= Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_without_retry_after_uses_fallback_wait() {
        let source =
            ScriptedSource::new(vec![Err(PlatformError::RateLimited { retry_after: None })]);
        let client = RateLimitedClient::new(source, keepa_budget());

        client.fetch_batch(&ids(1)).await.expect("retry succeeds");
        let times = client.inner().call_times();
        assert!(times[1].duration_since(times[0]) >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_gives_up_after_bounded_retries() {
        let throttled = || {
            Err(PlatformError::RateLimited {
                retry_after: Some(Duration::from_secs(1)),
            })
        };
        let source = ScriptedSource::new((0..10).map(|_| throttled()).collect());
        let client = RateLimitedClient::new(source, keepa_budget());

        let err = client.fetch_batch(&ids(1)).await.expect_err("should give up");
        assert!(err.is_rate_limited());
        // initial attempt plus three retries
        assert_eq!(client.inner().call_times().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let source = ScriptedSource::new(vec![Err(PlatformError::api(500, "boom"))]);
        let client = RateLimitedClient::new(source, keepa_budget());

        let err = client.fetch_batch(&ids(1)).await.expect_err("should fail");
        assert!(matches!(err, PlatformError::Api { status: 500, .. }));
        assert_eq!(client.inner().call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_batches_are_rejected_before_calling() {
        let client = RateLimitedClient::new(ScriptedSource::ok_forever(), keepa_budget());
        let err = client.fetch_batch(&ids(11)).await.expect_err("too many ids");
        assert!(err.to_string().contains("exceeds"));
        assert!(client.inner().call_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_backoff_is_reported_to_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_capture = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |event| {
            if matches!(event, SyncProgress::Throttled { .. }) {
                seen_capture.fetch_add(1, Ordering::SeqCst);
            }
        });

        let source = ScriptedSource::new(vec![Err(PlatformError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        })]);
        let client =
            RateLimitedClient::new(source, keepa_budget()).with_progress(Arc::new(callback));

        client.fetch_batch(&ids(1)).await.expect("retry succeeds");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn min_gap_spaces_consecutive_calls() {
        let budget = keepa_budget().with_min_gap(Duration::from_millis(150));
        let client = RateLimitedClient::new(ScriptedSource::ok_forever(), budget);

        let start = std::time::Instant::now();
        client.fetch_batch(&ids(1)).await.expect("first");
        client.fetch_batch(&ids(1)).await.expect("second");
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}

//! Sync coordinator: one pass per (source, job type), many sources at once.
//!
//! A pass never returns `Err`. Whatever goes wrong is folded into the
//! [`SourceSyncResult`] so callers can always render a partial-success
//! summary; when several sources run together one source's failure never
//! touches another's pass.
//!
//! # Example
//!
//! ```ignore
//! use arbiter::sync::{PassKind, SyncCoordinator, SyncMode, SyncOptions};
//!
//! let coordinator = SyncCoordinator::new(ctx, SyncOptions::default());
//! let summary = coordinator
//!     .run_all(&adapters, PassKind::Orders(SyncMode::Incremental))
//!     .await;
//! for error in &summary.errors {
//!     eprintln!("{error}");
//! }
//! ```

mod comparisons;
mod orders;
mod prices;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use crate::entity::job_type::JobType;
use crate::entity::source::Source;
use crate::notify::{NotificationEvent, notify_best_effort};
use crate::platform::{Capabilities, PlatformError, SourceAdapter};
use crate::status::{JobIntervals, SyncStatusTracker};

use super::context::EngineContext;
use super::progress::{SyncProgress, emit};
use super::types::{SourceSyncResult, SyncMode, SyncOptions, SyncSummary};

/// What a pass does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Orders(SyncMode),
    Prices,
    Comparisons,
}

impl PassKind {
    pub fn job_type(self) -> JobType {
        match self {
            PassKind::Orders(mode) => mode.job_type(),
            PassKind::Prices => JobType::PriceSync,
            PassKind::Comparisons => JobType::ComparisonSync,
        }
    }

    fn missing_capability(self, caps: Capabilities) -> Option<&'static str> {
        match self {
            PassKind::Orders(_) if !caps.orders => Some("order sync"),
            PassKind::Prices if !caps.prices => Some("price sync"),
            PassKind::Comparisons if !caps.listings => Some("comparison listings"),
            _ => None,
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassKind::Orders(mode) => write!(f, "{mode}"),
            PassKind::Prices => f.write_str("prices"),
            PassKind::Comparisons => f.write_str("comparisons"),
        }
    }
}

/// Runs sync passes against any [`SourceAdapter`].
#[derive(Clone)]
pub struct SyncCoordinator {
    ctx: EngineContext,
    options: SyncOptions,
    tracker: SyncStatusTracker,
}

impl SyncCoordinator {
    pub fn new(ctx: EngineContext, options: SyncOptions) -> Self {
        let tracker = SyncStatusTracker::new(ctx.db_handle(), ctx.user_id(), JobIntervals::default());
        Self {
            ctx,
            options,
            tracker,
        }
    }

    #[must_use]
    pub fn with_intervals(mut self, intervals: JobIntervals) -> Self {
        self.tracker = SyncStatusTracker::new(self.ctx.db_handle(), self.ctx.user_id(), intervals);
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn tracker(&self) -> &SyncStatusTracker {
        &self.tracker
    }

    /// Run one pass for one source.
    ///
    /// The pass is recorded as a job, bounded by the configured timeout and
    /// stopped between pages when shutdown is requested.
    #[tracing::instrument(skip_all, fields(source = %adapter.source(), pass = %kind))]
    pub async fn run(&self, adapter: &dyn SourceAdapter, kind: PassKind) -> SourceSyncResult {
        let source = adapter.source();
        let job_type = kind.job_type();

        if let Some(capability) = kind.missing_capability(adapter.capabilities()) {
            let err = PlatformError::unsupported(source.as_str(), capability);
            emit(
                self.ctx.progress(),
                SyncProgress::Warning {
                    message: err.to_string(),
                },
            );
            return SourceSyncResult::failed(source, job_type, err.to_string());
        }

        emit(
            self.ctx.progress(),
            SyncProgress::PassStarted {
                source,
                job_type,
                mode: kind.to_string(),
            },
        );

        let job = match self.tracker.start(source, job_type).await {
            Ok(job) => job,
            Err(e) => {
                let result =
                    SourceSyncResult::failed(source, job_type, format!("could not record job: {e}"));
                self.report(&result).await;
                return result;
            }
        };

        let mut result = SourceSyncResult::new(source, job_type);
        let pass = async {
            match kind {
                PassKind::Orders(mode) => {
                    orders::order_pass(&self.ctx, adapter, mode, &self.options, &mut result).await
                }
                PassKind::Prices => prices::price_pass(&self.ctx, adapter, &mut result).await,
                PassKind::Comparisons => {
                    comparisons::comparison_pass(&self.ctx, adapter, &mut result).await
                }
            }
        };
        if tokio::time::timeout(self.options.pass_timeout, pass)
            .await
            .is_err()
        {
            result.abort(format!(
                "pass timed out after {}s",
                self.options.pass_timeout.as_secs()
            ));
        }
        result.completed_at = Utc::now();

        let counts = result.counts();
        let finished = if result.success {
            job.complete(counts).await
        } else {
            job.fail(&result.errors, counts).await
        };
        if let Err(e) = finished {
            tracing::warn!(source = %source, job_type = %job_type, error = %e, "Could not finalize job record");
        }

        self.report(&result).await;
        result
    }

    /// Run an order pass in `mode`.
    pub async fn run_orders(&self, adapter: &dyn SourceAdapter, mode: SyncMode) -> SourceSyncResult {
        self.run(adapter, PassKind::Orders(mode)).await
    }

    /// Run the same pass for several sources concurrently.
    ///
    /// Each source gets its own task; at most `options.concurrency` run at a
    /// time. Results come back in `adapters` order.
    #[tracing::instrument(skip_all, fields(sources = adapters.len(), pass = %kind))]
    pub async fn run_all(&self, adapters: &[Arc<dyn SourceAdapter>], kind: PassKind) -> SyncSummary {
        if adapters.is_empty() {
            return SyncSummary::from_results(Vec::new());
        }

        emit(
            self.ctx.progress(),
            SyncProgress::SyncingSources {
                count: adapters.len(),
            },
        );

        let concurrency = self.options.concurrency.clamp(1, adapters.len());
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let source = adapter.source();
            let adapter = Arc::clone(adapter);
            let coordinator = self.clone();
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return SourceSyncResult::failed(
                            adapter.source(),
                            kind.job_type(),
                            "Semaphore closed unexpectedly",
                        );
                    }
                };
                coordinator.run(adapter.as_ref(), kind).await
            });
            handles.push((source, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (source, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(SourceSyncResult::failed(
                    source,
                    kind.job_type(),
                    format!("Task panic: {}", e),
                )),
            }
        }

        let summary = SyncSummary::from_results(results);
        emit(
            self.ctx.progress(),
            SyncProgress::SyncSourcesComplete {
                successful: summary.successful(),
                failed: summary.failed(),
            },
        );
        summary
    }

    /// Like [`run_all`](Self::run_all), limited to sources whose pass is due
    /// at `now`.
    pub async fn run_due(
        &self,
        adapters: &[Arc<dyn SourceAdapter>],
        kind: PassKind,
        now: DateTime<Utc>,
    ) -> SyncSummary {
        let job_type = kind.job_type();
        let candidates: Vec<(Source, JobType)> =
            adapters.iter().map(|a| (a.source(), job_type)).collect();

        let due = match self.tracker.due_jobs(&candidates, now).await {
            Ok(due) => due,
            Err(e) => {
                let failed = adapters
                    .iter()
                    .map(|a| {
                        SourceSyncResult::failed(
                            a.source(),
                            job_type,
                            format!("could not read job status: {e}"),
                        )
                    })
                    .collect();
                return SyncSummary::from_results(failed);
            }
        };

        let selected: Vec<Arc<dyn SourceAdapter>> = adapters
            .iter()
            .filter(|a| due.iter().any(|(source, _)| *source == a.source()))
            .cloned()
            .collect();
        tracing::debug!(due = selected.len(), total = adapters.len(), "Selected due sources");
        self.run_all(&selected, kind).await
    }

    async fn report(&self, result: &SourceSyncResult) {
        emit(
            self.ctx.progress(),
            SyncProgress::PassComplete {
                source: result.source,
                job_type: result.job_type,
                success: result.success,
                processed: result.processed,
                created: result.created,
                updated: result.updated,
                failed: result.failed,
            },
        );

        if result.success {
            tracing::info!(
                source = %result.source,
                job_type = %result.job_type,
                processed = result.processed,
                created = result.created,
                updated = result.updated,
                failed = result.failed,
                "Pass complete"
            );
            return;
        }

        let error = result.errors.last().cloned().unwrap_or_default();
        tracing::warn!(source = %result.source, job_type = %result.job_type, error = %error, "Pass failed");
        notify_best_effort(
            self.ctx.notifier(),
            NotificationEvent::SyncFailed {
                source: result.source,
                error,
            },
        )
        .await;
    }
}

/// Count and report one record that could not be normalized.
fn record_failed(
    ctx: &EngineContext,
    source: Source,
    result: &mut SourceSyncResult,
    err: &PlatformError,
) {
    let record = match err {
        PlatformError::Normalization { record, .. } => record.clone(),
        PlatformError::NotFound { resource } => resource.clone(),
        _ => String::from("<unknown>"),
    };
    tracing::debug!(source = %source, record = %record, error = %err, "Record skipped");
    result.failed += 1;
    result.errors.push(err.to_string());
    emit(
        ctx.progress(),
        SyncProgress::RecordFailed {
            source,
            record,
            error: err.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use super::*;
    use crate::platform::LineItemMode;
    use crate::sync::progress::ProgressCallback;

    struct PricesOnly;

    #[async_trait::async_trait]
    impl SourceAdapter for PricesOnly {
        fn source(&self) -> Source {
            Source::Keepa
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                prices: true,
                line_items: LineItemMode::Inline,
                ..Capabilities::NONE
            }
        }
    }

    fn context(events: Arc<Mutex<Vec<String>>>) -> EngineContext {
        let callback: ProgressCallback = Box::new(move |event| {
            events.lock().unwrap().push(format!("{event:?}"));
        });
        EngineContext::builder()
            .database(Arc::new(
                MockDatabase::new(DatabaseBackend::Sqlite).into_connection(),
            ))
            .user_id(Uuid::nil())
            .progress(Arc::new(callback))
            .build()
            .unwrap()
    }

    #[test]
    fn pass_kind_maps_job_types() {
        assert_eq!(
            PassKind::Orders(SyncMode::Incremental).job_type(),
            JobType::OrderSync
        );
        assert_eq!(PassKind::Prices.job_type(), JobType::PriceSync);
        assert_eq!(PassKind::Comparisons.to_string(), "comparisons");
        assert_eq!(PassKind::Orders(SyncMode::Full).to_string(), "full");
    }

    #[test]
    fn missing_capability_is_detected() {
        let caps = PricesOnly.capabilities();
        assert_eq!(
            PassKind::Orders(SyncMode::Full).missing_capability(caps),
            Some("order sync")
        );
        assert_eq!(PassKind::Prices.missing_capability(caps), None);
    }

    #[tokio::test]
    async fn unsupported_pass_fails_without_touching_the_store() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let coordinator = SyncCoordinator::new(context(Arc::clone(&events)), SyncOptions::default());

        let result = coordinator
            .run(&PricesOnly, PassKind::Orders(SyncMode::Incremental))
            .await;

        assert!(!result.success);
        assert_eq!(result.errors, vec!["keepa does not support order sync".to_string()]);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].contains("Warning"));
    }

    #[tokio::test]
    async fn run_all_with_no_sources_is_empty_success() {
        let coordinator = SyncCoordinator::new(
            context(Arc::new(Mutex::new(Vec::new()))),
            SyncOptions::default(),
        );
        let summary = coordinator
            .run_all(&[], PassKind::Orders(SyncMode::Incremental))
            .await;
        assert!(summary.success);
        assert!(summary.results.is_empty());
    }
}

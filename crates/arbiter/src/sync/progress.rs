//! Progress reporting types for sync operations.
//!
//! Every long-running engine operation reports through one event enum so the
//! CLI (or any other caller) can render progress without knowing which
//! component produced it.

use crate::entity::job_type::JobType;
use crate::entity::source::Source;

/// Progress events emitted by the coordinator, the rate-limited client and
/// the reconciler.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A pass for one source has started.
    PassStarted {
        source: Source,
        job_type: JobType,
        /// Human-readable mode ("incremental", "full", "historical").
        mode: String,
    },

    /// Fetched a page of raw records.
    FetchedPage {
        source: Source,
        /// Page number (1-indexed).
        page: u32,
        /// Number of records on this page.
        count: usize,
    },

    /// One record could not be normalized or persisted.
    RecordFailed {
        source: Source,
        record: String,
        error: String,
    },

    /// A batch of normalized records was committed.
    PersistedBatch {
        source: Source,
        created: usize,
        updated: usize,
        failed: usize,
    },

    /// The cursor moved after a durable commit.
    CursorAdvanced {
        source: Source,
        job_type: JobType,
        /// RFC 3339 timestamp of the new watermark.
        position: String,
    },

    /// Waited locally for token budget before a call.
    BudgetWait {
        source: Source,
        cost: f64,
        waited_ms: u64,
    },

    /// The source throttled a call; backing off before retry.
    Throttled {
        source: Source,
        /// Retry attempt number (1-indexed).
        attempt: u32,
        retry_after_ms: u64,
    },

    /// A sale matched a cross-listed item and removal entries were queued.
    ReconciliationMatch {
        sale_source: Source,
        item_key: String,
        order_id: String,
        /// Sources the item must be removed from.
        targets: Vec<Source>,
    },

    /// A pass finished (successfully or not).
    PassComplete {
        source: Source,
        job_type: JobType,
        success: bool,
        processed: usize,
        created: usize,
        updated: usize,
        failed: usize,
    },

    /// Syncing several sources concurrently.
    SyncingSources { count: usize },

    /// Completed a multi-source sync.
    SyncSourcesComplete { successful: usize, failed: usize },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// This is a convenience function to avoid repetitive `if let Some(cb) = ...` patterns.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            SyncProgress::FetchedPage {
                source: Source::Amazon,
                page: 1,
                count: 10,
            },
        );
        emit(
            Some(&callback),
            SyncProgress::SyncSourcesComplete {
                successful: 2,
                failed: 1,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        // Should not panic when callback is None
        emit(
            None,
            SyncProgress::Warning {
                message: "ignored".to_string(),
            },
        );
    }

    #[test]
    fn test_sync_progress_debug() {
        let event = SyncProgress::ReconciliationMatch {
            sale_source: Source::Ebay,
            item_key: "75192".to_string(),
            order_id: "12-34567-89012".to_string(),
            targets: vec![Source::BrickLink],
        };

        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("ReconciliationMatch"));
        assert!(debug_str.contains("75192"));
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::entity::source::Source;
use crate::platform::CursorPosition;
use crate::store::JobCounts;
use crate::sync::DEFAULT_PASS_TIMEOUT;

/// SKU prefix marking an item that is listed on several sources.
pub const DEFAULT_SKU_PREFIX: &str = "SYNC-";

/// Stored orders read per query.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub sku_prefix: String,
    pub batch_size: u64,
    /// Wall-clock budget for one source's pass.
    pub pass_timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            sku_prefix: DEFAULT_SKU_PREFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }
}

/// A sale that claimed a cross-listed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleMatch {
    pub item_key: String,
    pub order_id: String,
    pub targets: Vec<Source>,
    /// Removal entries actually inserted (0 on a replay).
    pub queued: u64,
}

/// Outcome of reconciling one source's order stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReconcileResult {
    pub source: Source,
    pub success: bool,
    pub processed: usize,
    pub matched: usize,
    pub queued: u64,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Reconciliation cursor after the run, when it moved.
    pub cursor: Option<CursorPosition>,
}

impl SourceReconcileResult {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            success: true,
            processed: 0,
            matched: 0,
            queued: 0,
            failed: 0,
            errors: Vec::new(),
            cursor: None,
        }
    }

    pub fn abort(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    pub(crate) fn counts(&self) -> JobCounts {
        JobCounts {
            processed: self.processed,
            created: self.queued as usize,
            updated: self.matched,
            failed: self.failed,
        }
    }
}

/// Aggregate of a reconciliation run over several sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileResult {
    pub results: Vec<SourceReconcileResult>,
    pub success: bool,
    pub processed: usize,
    pub matched: usize,
    pub queued: u64,
    /// Every source's errors, each prefixed with its source name.
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl ReconcileResult {
    pub fn from_results(results: Vec<SourceReconcileResult>) -> Self {
        let errors = results
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| format!("{}: {}", r.source, e)))
            .collect();
        Self {
            success: results.iter().all(|r| r.success),
            processed: results.iter().map(|r| r.processed).sum(),
            matched: results.iter().map(|r| r.matched).sum(),
            queued: results.iter().map(|r| r.queued).sum(),
            errors,
            completed_at: Utc::now(),
            results,
        }
    }
}

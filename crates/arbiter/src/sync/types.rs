//! Sync modes, options and result types.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::entity::job_type::JobType;
use crate::entity::source::Source;
use crate::platform::CursorPosition;
use crate::store::JobCounts;

/// Orders requested per `list_orders` call.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Wall-clock budget for one source's pass.
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Sources synced at once by `run_all`.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// How an order pass chooses what to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only records after the stored cursor.
    Incremental,
    /// Everything; the cursor is reset to the pass start time afterwards.
    Full,
    /// A closed creation-date range. Leaves the incremental cursor alone.
    Historical {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Incremental => "incremental",
            SyncMode::Full => "full",
            SyncMode::Historical { .. } => "historical",
        }
    }

    /// Job type the pass is recorded under.
    pub fn job_type(&self) -> JobType {
        match self {
            SyncMode::Historical { .. } => JobType::HistoricalImport,
            _ => JobType::OrderSync,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    /// Parses the cursor-driven modes. Historical needs a range and is
    /// built directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" | "inc" => Ok(SyncMode::Incremental),
            "full" => Ok(SyncMode::Full),
            _ => Err(format!("Unknown sync mode: {}", s)),
        }
    }
}

/// Options shared by every pass a coordinator runs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_limit: u32,
    /// Fetch line items for sources that need a second call per order.
    /// Costs one billable call per order.
    pub include_line_items: bool,
    pub pass_timeout: Duration,
    /// Sources synced at once by `run_all`.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            include_line_items: true,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Outcome of one pass over one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSyncResult {
    pub source: Source,
    pub job_type: JobType,
    pub success: bool,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// Ids the source acknowledged but returned nothing for.
    pub not_found: usize,
    /// Listings pruned because the source no longer shows them.
    pub pruned: u64,
    pub errors: Vec<String>,
    /// Cursor after the pass, when the pass moved it.
    pub cursor: Option<CursorPosition>,
    pub completed_at: DateTime<Utc>,
}

impl SourceSyncResult {
    pub fn new(source: Source, job_type: JobType) -> Self {
        Self {
            source,
            job_type,
            success: true,
            processed: 0,
            created: 0,
            updated: 0,
            failed: 0,
            not_found: 0,
            pruned: 0,
            errors: Vec::new(),
            cursor: None,
            completed_at: Utc::now(),
        }
    }

    /// A pass that could not run at all.
    pub fn failed(source: Source, job_type: JobType, error: impl Into<String>) -> Self {
        let mut result = Self::new(source, job_type);
        result.abort(error);
        result
    }

    /// Mark the whole pass failed with one error entry.
    pub fn abort(&mut self, error: impl Into<String>) {
        self.success = false;
        self.errors.push(error.into());
    }

    pub fn counts(&self) -> JobCounts {
        JobCounts {
            processed: self.processed,
            created: self.created,
            updated: self.updated,
            failed: self.failed,
        }
    }
}

/// Aggregate of several passes run together.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub results: Vec<SourceSyncResult>,
    pub success: bool,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    /// Every pass's errors, each prefixed with its source name.
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl SyncSummary {
    pub fn from_results(results: Vec<SourceSyncResult>) -> Self {
        let errors = results
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| format!("{}: {}", r.source, e)))
            .collect();

        Self {
            success: results.iter().all(|r| r.success),
            processed: results.iter().map(|r| r.processed).sum(),
            created: results.iter().map(|r| r.created).sum(),
            updated: results.iter().map(|r| r.updated).sum(),
            errors,
            completed_at: Utc::now(),
            results,
        }
    }

    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.successful()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mode_parses_and_maps_job_type() {
        assert_eq!("full".parse::<SyncMode>().unwrap(), SyncMode::Full);
        assert_eq!("INC".parse::<SyncMode>().unwrap(), SyncMode::Incremental);
        assert!("historical".parse::<SyncMode>().is_err());

        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let historical = SyncMode::Historical { from, to: from };
        assert_eq!(historical.job_type(), JobType::HistoricalImport);
        assert_eq!(SyncMode::Full.job_type(), JobType::OrderSync);
        assert_eq!(historical.to_string(), "historical");
    }

    #[test]
    fn summary_prefixes_errors_with_source() {
        let mut ok = SourceSyncResult::new(Source::Amazon, JobType::OrderSync);
        ok.processed = 3;
        ok.created = 2;
        ok.updated = 1;
        let bad =
            SourceSyncResult::failed(Source::Ebay, JobType::OrderSync, "Authentication required");

        let summary = SyncSummary::from_results(vec![ok, bad]);
        assert!(!summary.success);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.errors, vec!["ebay: Authentication required".to_string()]);
        assert_eq!(summary.successful(), 1);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn empty_summary_is_successful() {
        let summary = SyncSummary::from_results(Vec::new());
        assert!(summary.success);
        assert!(summary.errors.is_empty());
    }
}

//! Job lifecycle records and due-for-next-run decisions.
//!
//! Every pass is bracketed by [`SyncStatusTracker::start`] and one of
//! [`JobHandle::complete`] / [`JobHandle::fail`]. The history row lives in
//! `sync_jobs`; the latest run per (user, source, job type) is kept in
//! `sync_status` and drives [`SyncStatusTracker::is_due`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::entity::job_type::{JobStatus, JobType};
use crate::entity::source::Source;
use crate::entity::sync_job;
use crate::store::{self, JobCounts};

/// Error summaries stored on job rows are capped at this many messages.
const MAX_SUMMARY_ERRORS: usize = 5;

/// How often each job type should run.
///
/// Job types without an interval are never due on their own (historical
/// imports are started by hand).
#[derive(Debug, Clone, PartialEq)]
pub struct JobIntervals {
    intervals: HashMap<JobType, Duration>,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self::new()
            .with(JobType::OrderSync, Duration::minutes(15))
            .with(JobType::Reconciliation, Duration::minutes(15))
            .with(JobType::PriceSync, Duration::minutes(60))
            .with(JobType::ComparisonSync, Duration::hours(6))
    }
}

impl JobIntervals {
    /// No intervals configured.
    pub fn new() -> Self {
        Self {
            intervals: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, job_type: JobType, every: Duration) -> Self {
        self.intervals.insert(job_type, every);
        self
    }

    pub fn get(&self, job_type: JobType) -> Option<Duration> {
        self.intervals.get(&job_type).copied()
    }
}

/// Records job runs for one user.
#[derive(Clone)]
pub struct SyncStatusTracker {
    db: Arc<DatabaseConnection>,
    user_id: Uuid,
    intervals: JobIntervals,
}

impl SyncStatusTracker {
    pub fn new(db: Arc<DatabaseConnection>, user_id: Uuid, intervals: JobIntervals) -> Self {
        Self {
            db,
            user_id,
            intervals,
        }
    }

    pub fn intervals(&self) -> &JobIntervals {
        &self.intervals
    }

    /// Insert a `running` row and hand back the handle that finalizes it.
    pub async fn start(&self, source: Source, job_type: JobType) -> store::Result<JobHandle> {
        let job =
            store::jobs::insert_running(self.db.as_ref(), self.user_id, source, job_type, Utc::now())
                .await?;
        tracing::debug!(source = %source, job_type = %job_type, job = %job.id, "Job started");
        Ok(JobHandle {
            db: Arc::clone(&self.db),
            job,
        })
    }

    /// Whether `(source, job_type)` should run at `now`.
    ///
    /// Due when it never ran or its last run started at least one interval
    /// ago. Job types without an interval are never due.
    pub async fn is_due(
        &self,
        source: Source,
        job_type: JobType,
        now: DateTime<Utc>,
    ) -> store::Result<bool> {
        let Some(every) = self.intervals.get(job_type) else {
            return Ok(false);
        };
        let latest =
            store::jobs::latest_for(self.db.as_ref(), self.user_id, source, job_type).await?;
        Ok(due_at(latest.map(|row| row.last_run_at.with_timezone(&Utc)), every, now))
    }

    /// Every `(source, job_type)` pair among `candidates` that is due.
    pub async fn due_jobs(
        &self,
        candidates: &[(Source, JobType)],
        now: DateTime<Utc>,
    ) -> store::Result<Vec<(Source, JobType)>> {
        let latest: HashMap<(Source, JobType), DateTime<Utc>> =
            store::jobs::latest(self.db.as_ref(), self.user_id)
                .await?
                .into_iter()
                .map(|row| ((row.source, row.job_type), row.last_run_at.with_timezone(&Utc)))
                .collect();

        Ok(candidates
            .iter()
            .copied()
            .filter(|key| {
                self.intervals
                    .get(key.1)
                    .is_some_and(|every| due_at(latest.get(key).copied(), every, now))
            })
            .collect())
    }
}

fn due_at(last_run: Option<DateTime<Utc>>, every: Duration, now: DateTime<Utc>) -> bool {
    last_run.is_none_or(|at| now >= at + every)
}

/// An open job row. Finalize it exactly once.
pub struct JobHandle {
    db: Arc<DatabaseConnection>,
    job: sync_job::Model,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.job.id
    }

    pub async fn complete(self, counts: JobCounts) -> store::Result<sync_job::Model> {
        store::jobs::finish(
            self.db.as_ref(),
            self.job,
            JobStatus::Completed,
            counts,
            None,
            Utc::now(),
        )
        .await
    }

    /// Complete the job but keep the per-record errors it collected.
    pub async fn complete_with_errors(
        self,
        errors: &[String],
        counts: JobCounts,
    ) -> store::Result<sync_job::Model> {
        let summary = (!errors.is_empty()).then(|| error_summary(errors));
        store::jobs::finish(
            self.db.as_ref(),
            self.job,
            JobStatus::Completed,
            counts,
            summary,
            Utc::now(),
        )
        .await
    }

    pub async fn fail(self, errors: &[String], counts: JobCounts) -> store::Result<sync_job::Model> {
        store::jobs::finish(
            self.db.as_ref(),
            self.job,
            JobStatus::Failed,
            counts,
            Some(error_summary(errors)),
            Utc::now(),
        )
        .await
    }
}

fn error_summary(errors: &[String]) -> String {
    let mut summary = errors
        .iter()
        .take(MAX_SUMMARY_ERRORS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if errors.len() > MAX_SUMMARY_ERRORS {
        summary.push_str(&format!(" (+{} more)", errors.len() - MAX_SUMMARY_ERRORS));
    }
    if summary.is_empty() {
        summary.push_str("failed");
    }
    summary
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::entity::sync_status;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    fn status_row(source: Source, job_type: JobType, last_run: DateTime<Utc>) -> sync_status::Model {
        sync_status::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            source,
            job_type,
            last_job_id: Uuid::new_v4(),
            status: JobStatus::Completed,
            last_run_at: last_run.fixed_offset(),
            last_success_at: Some(last_run.fixed_offset()),
            last_duration_ms: Some(1_000),
            processed: 1,
            created: 1,
            updated: 0,
            failed: 0,
            last_error: None,
        }
    }

    #[test]
    fn due_when_never_run_or_interval_elapsed() {
        let every = Duration::minutes(15);
        assert!(due_at(None, every, at(12, 0)));
        assert!(!due_at(Some(at(12, 0)), every, at(12, 14)));
        assert!(due_at(Some(at(12, 0)), every, at(12, 15)));
    }

    #[test]
    fn error_summary_is_capped() {
        let errors: Vec<String> = (0..7).map(|i| format!("e{i}")).collect();
        assert_eq!(error_summary(&errors), "e0; e1; e2; e3; e4 (+2 more)");
        assert_eq!(error_summary(&[]), "failed");
    }

    #[test]
    fn default_intervals_skip_historical() {
        let intervals = JobIntervals::default();
        assert_eq!(intervals.get(JobType::OrderSync), Some(Duration::minutes(15)));
        assert_eq!(intervals.get(JobType::HistoricalImport), None);
    }

    #[tokio::test]
    async fn is_due_reads_latest_run() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![status_row(Source::Amazon, JobType::OrderSync, at(12, 0))]])
            .into_connection();
        let tracker = SyncStatusTracker::new(Arc::new(db), Uuid::nil(), JobIntervals::default());

        assert!(
            !tracker
                .is_due(Source::Amazon, JobType::OrderSync, at(12, 10))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn job_type_without_interval_is_never_due() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let tracker = SyncStatusTracker::new(Arc::new(db), Uuid::nil(), JobIntervals::new());
        assert!(
            !tracker
                .is_due(Source::Ebay, JobType::OrderSync, at(12, 0))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn due_jobs_filters_candidates() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![
                status_row(Source::Amazon, JobType::OrderSync, at(12, 0)),
                status_row(Source::Keepa, JobType::PriceSync, at(10, 0)),
            ]])
            .into_connection();
        let tracker = SyncStatusTracker::new(Arc::new(db), Uuid::nil(), JobIntervals::default());

        let due = tracker
            .due_jobs(
                &[
                    (Source::Amazon, JobType::OrderSync),
                    (Source::Keepa, JobType::PriceSync),
                    (Source::Ebay, JobType::OrderSync),
                    (Source::Ebay, JobType::HistoricalImport),
                ],
                at(12, 5),
            )
            .await
            .unwrap();
        assert_eq!(
            due,
            vec![
                (Source::Keepa, JobType::PriceSync),
                (Source::Ebay, JobType::OrderSync)
            ]
        );
    }
}

//! Job history (`sync_jobs`) and the latest-run table (`sync_status`).

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::job_type::{JobStatus, JobType};
use crate::entity::source::Source;
use crate::entity::sync_job::{self, Entity as SyncJob};
use crate::entity::sync_status::{self, Entity as SyncStatus};

use super::errors::{Result, StoreError};

/// Counters carried by job rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

fn clamp(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Insert a `running` history row.
pub async fn insert_running<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    job_type: JobType,
    started_at: DateTime<Utc>,
) -> Result<sync_job::Model> {
    let model = sync_job::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        source: Set(source),
        job_type: Set(job_type),
        status: Set(JobStatus::Running),
        started_at: Set(started_at.fixed_offset()),
        finished_at: Set(None),
        duration_ms: Set(None),
        processed: Set(0),
        created: Set(0),
        updated: Set(0),
        failed: Set(0),
        error_summary: Set(None),
    };
    model.insert(db).await.map_err(StoreError::from)
}

/// Finalize a history row and upsert the matching latest-run row.
pub async fn finish<C: ConnectionTrait>(
    db: &C,
    job: sync_job::Model,
    status: JobStatus,
    counts: JobCounts,
    error_summary: Option<String>,
    finished_at: DateTime<Utc>,
) -> Result<sync_job::Model> {
    let started_at = job.started_at;
    let duration_ms = (finished_at.fixed_offset() - started_at)
        .num_milliseconds()
        .max(0);

    let mut active: sync_job::ActiveModel = job.into();
    active.status = Set(status);
    active.finished_at = Set(Some(finished_at.fixed_offset()));
    active.duration_ms = Set(Some(duration_ms));
    active.processed = Set(clamp(counts.processed));
    active.created = Set(clamp(counts.created));
    active.updated = Set(clamp(counts.updated));
    active.failed = Set(clamp(counts.failed));
    active.error_summary = Set(error_summary.clone());
    let job = active.update(db).await?;

    let success = status == JobStatus::Completed;
    let latest = sync_status::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(job.user_id),
        source: Set(job.source),
        job_type: Set(job.job_type),
        last_job_id: Set(job.id),
        status: Set(status),
        last_run_at: Set(started_at),
        last_success_at: Set(success.then(|| finished_at.fixed_offset())),
        last_duration_ms: Set(Some(duration_ms)),
        processed: Set(job.processed),
        created: Set(job.created),
        updated: Set(job.updated),
        failed: Set(job.failed),
        last_error: Set(error_summary),
    };

    let mut update_columns = vec![
        sync_status::Column::LastJobId,
        sync_status::Column::Status,
        sync_status::Column::LastRunAt,
        sync_status::Column::LastDurationMs,
        sync_status::Column::Processed,
        sync_status::Column::Created,
        sync_status::Column::Updated,
        sync_status::Column::Failed,
        sync_status::Column::LastError,
    ];
    // A failed run keeps the previous success time.
    if success {
        update_columns.push(sync_status::Column::LastSuccessAt);
    }

    SyncStatus::insert(latest)
        .on_conflict(
            OnConflict::columns([
                sync_status::Column::UserId,
                sync_status::Column::Source,
                sync_status::Column::JobType,
            ])
            .update_columns(update_columns)
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(job)
}

/// Latest-run rows for a user.
pub async fn latest<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Vec<sync_status::Model>> {
    SyncStatus::find()
        .filter(sync_status::Column::UserId.eq(user_id))
        .order_by_asc(sync_status::Column::Source)
        .order_by_asc(sync_status::Column::JobType)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Latest-run row for one key.
pub async fn latest_for<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    job_type: JobType,
) -> Result<Option<sync_status::Model>> {
    SyncStatus::find()
        .filter(sync_status::Column::UserId.eq(user_id))
        .filter(sync_status::Column::Source.eq(source))
        .filter(sync_status::Column::JobType.eq(job_type))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Most recent history rows, newest first.
pub async fn history<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    limit: u64,
) -> Result<Vec<sync_job::Model>> {
    SyncJob::find()
        .filter(sync_job::Column::UserId.eq(user_id))
        .order_by_desc(sync_job::Column::StartedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_saturates() {
        assert_eq!(clamp(5), 5);
        assert_eq!(clamp(usize::MAX), i32::MAX);
    }
}

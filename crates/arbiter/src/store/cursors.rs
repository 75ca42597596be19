//! Durable sync watermarks keyed by `(user, source, job_type)`.
//!
//! A cursor only ever moves forward. Callers advance it after the records
//! up to the new position are committed; a crash before the advance simply
//! replays those records, which the natural-key upserts absorb.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::job_type::JobType;
use crate::entity::source::Source;
use crate::entity::sync_cursor::{ActiveModel, Column, Entity as SyncCursor, Model};
use crate::platform::CursorPosition;

use super::errors::{Result, StoreError};

/// Load the cursor row for a key.
pub async fn get<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    job_type: JobType,
) -> Result<Option<Model>> {
    SyncCursor::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Source.eq(source))
        .filter(Column::JobType.eq(job_type))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Current position for a key, if one was ever stored.
pub async fn position<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    job_type: JobType,
) -> Result<Option<CursorPosition>> {
    Ok(get(db, user_id, source, job_type).await?.map(|m| to_position(&m)))
}

pub fn to_position(model: &Model) -> CursorPosition {
    CursorPosition {
        at: model.position_at.with_timezone(&Utc),
        token: model.position_token.clone(),
    }
}

fn upsert_on_conflict(columns: Vec<Column>) -> OnConflict {
    OnConflict::columns([Column::UserId, Column::Source, Column::JobType])
        .update_columns(columns)
        .to_owned()
}

/// Move the cursor to `to` if that is ahead of the stored position.
///
/// Returns `true` when the stored position changed. A position at or
/// behind the stored one is ignored, so concurrent or replayed passes can
/// never move a cursor backwards.
pub async fn advance<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    job_type: JobType,
    to: &CursorPosition,
) -> Result<bool> {
    if let Some(current) = position(db, user_id, source, job_type).await?
        && current >= *to
    {
        tracing::trace!(
            source = %source,
            job_type = %job_type,
            current = %current.at,
            requested = %to.at,
            "Cursor already at or past requested position"
        );
        return Ok(false);
    }

    let now = Utc::now().fixed_offset();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        source: Set(source),
        job_type: Set(job_type),
        position_at: Set(to.at.fixed_offset()),
        position_token: Set(to.token.clone()),
        historical_completed_at: Set(None),
        updated_at: Set(now),
    };

    SyncCursor::insert(model)
        .on_conflict(upsert_on_conflict(vec![
            Column::PositionAt,
            Column::PositionToken,
            Column::UpdatedAt,
        ]))
        .exec_without_returning(db)
        .await?;

    tracing::debug!(
        source = %source,
        job_type = %job_type,
        position = %to.at,
        "Cursor advanced"
    );
    Ok(true)
}

/// Record that a historical import finished its range ending at `range_end`.
///
/// Stored on the `(source, historical_import)` row so it never touches the
/// incremental cursor.
pub async fn mark_historical_complete<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    range_end: DateTime<Utc>,
) -> Result<()> {
    let now = Utc::now().fixed_offset();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        source: Set(source),
        job_type: Set(JobType::HistoricalImport),
        position_at: Set(range_end.fixed_offset()),
        position_token: Set(None),
        historical_completed_at: Set(Some(now)),
        updated_at: Set(now),
    };

    SyncCursor::insert(model)
        .on_conflict(upsert_on_conflict(vec![
            Column::PositionAt,
            Column::PositionToken,
            Column::HistoricalCompletedAt,
            Column::UpdatedAt,
        ]))
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// When the last historical import for a source completed, if ever.
pub async fn historical_completed_at<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
) -> Result<Option<DateTime<Utc>>> {
    Ok(get(db, user_id, source, JobType::HistoricalImport)
        .await?
        .and_then(|m| m.historical_completed_at)
        .map(|t| t.with_timezone(&Utc)))
}

/// All cursors for a user.
pub async fn list<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Vec<Model>> {
    SyncCursor::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::Source)
        .order_by_asc(Column::JobType)
        .all(db)
        .await
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    fn row(at: DateTime<Utc>, token: Option<&str>) -> Model {
        Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            source: Source::Amazon,
            job_type: JobType::OrderSync,
            position_at: at.fixed_offset(),
            position_token: token.map(str::to_string),
            historical_completed_at: None,
            updated_at: at.fixed_offset(),
        }
    }

    #[tokio::test]
    async fn advance_skips_positions_behind_the_stored_one() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![row(t, Some("A-200"))]])
            .into_connection();

        let moved = advance(
            &db,
            Uuid::nil(),
            Source::Amazon,
            JobType::OrderSync,
            &CursorPosition::with_token(t, "A-100"),
        )
        .await
        .expect("advance");

        assert!(!moved);
        // Only the read; no write was issued.
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn advance_writes_when_ahead() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![row(t, Some("A-100"))]])
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        let moved = advance(
            &db,
            Uuid::nil(),
            Source::Amazon,
            JobType::OrderSync,
            &CursorPosition::with_token(t, "A-101"),
        )
        .await
        .expect("advance");

        assert!(moved);
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[test]
    fn to_position_round_trips_token() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let pos = to_position(&row(t, Some("A-100")));
        assert_eq!(pos, CursorPosition::with_token(t, "A-100"));
    }
}

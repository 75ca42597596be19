use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, sea_query::OnConflict,
};

use crate::retry::{RetryConfig, with_retry};

use super::errors::{Result, StoreError};

// ─── Bulk Operations ─────────────────────────────────────────────────────────

/// Rows per `INSERT ... ON CONFLICT` statement.
pub const UPSERT_CHUNK_SIZE: usize = 100;

/// Created/updated/failed tallies for one or more upsert chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// One message per failed row, prefixed with the row's key.
    pub errors: Vec<String>,
}

impl UpsertCounts {
    pub fn written(&self) -> usize {
        self.created + self.updated
    }

    pub fn merge(&mut self, other: UpsertCounts) {
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

/// Keys written and rows rejected by one chunk.
#[derive(Debug, Default)]
pub(crate) struct ChunkOutcome {
    pub written: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl ChunkOutcome {
    /// Tally against the keys that existed before the write.
    pub fn counts(self, existing: &std::collections::HashSet<String>) -> UpsertCounts {
        let created = self
            .written
            .iter()
            .filter(|k| !existing.contains(*k))
            .count();
        UpsertCounts {
            created,
            updated: self.written.len() - created,
            failed: self.failed.len(),
            errors: self
                .failed
                .into_iter()
                .map(|(key, err)| format!("{key}: {err}"))
                .collect(),
        }
    }
}

/// Drop earlier rows that share a key with a later one, keeping first-seen order.
///
/// One statement may not touch the same conflict target twice.
pub(crate) fn dedupe_last<T>(rows: Vec<(String, T)>) -> Vec<(String, T)> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<(String, T)> = Vec::with_capacity(rows.len());

    for (key, row) in rows {
        match index.get(&key) {
            Some(&i) => out[i].1 = row,
            None => {
                index.insert(key.clone(), out.len());
                out.push((key, row));
            }
        }
    }

    out
}

/// Upsert one chunk of keyed rows.
///
/// Transient errors are retried with backoff. If the statement still fails
/// for a non-transient reason, each row is retried on its own so a single
/// bad row cannot sink its neighbours. When every row fails on its own too,
/// the failure is systemic and the original error is returned.
pub(crate) async fn upsert_chunk<E, C>(
    db: &C,
    rows: Vec<(String, E::ActiveModel)>,
    on_conflict: &OnConflict,
    label: &str,
) -> Result<ChunkOutcome>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Clone + Send,
{
    if rows.is_empty() {
        return Ok(ChunkOutcome::default());
    }

    let models: Vec<E::ActiveModel> = rows.iter().map(|(_, m)| m.clone()).collect();
    tracing::debug!(table = label, count = models.len(), "Starting bulk upsert");

    let batch = with_retry(
        || {
            E::insert_many(models.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
        },
        is_retryable_db_error,
        RetryConfig::default(),
        label,
    )
    .await;

    let batch_err = match batch {
        Ok(_) => {
            return Ok(ChunkOutcome {
                written: rows.into_iter().map(|(k, _)| k).collect(),
                failed: Vec::new(),
            });
        }
        Err(e) if is_retryable_db_error(&e) => return Err(StoreError::Database(e)),
        Err(e) => e,
    };

    tracing::warn!(
        table = label,
        count = rows.len(),
        error = %batch_err,
        "Bulk upsert rejected, isolating rows"
    );

    let total = rows.len();
    let mut outcome = ChunkOutcome::default();
    for (key, model) in rows {
        match E::insert(model)
            .on_conflict(on_conflict.clone())
            .exec_without_returning(db)
            .await
        {
            Ok(_) => outcome.written.push(key),
            Err(e) if is_retryable_db_error(&e) => return Err(StoreError::Database(e)),
            Err(e) => outcome.failed.push((key, e.to_string())),
        }
    }

    if outcome.failed.len() == total {
        return Err(StoreError::Database(batch_err));
    }

    Ok(outcome)
}

/// Whether a database error is worth retrying (locks, busy, dropped connections).
pub fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use sea_orm::{
        DatabaseBackend, MockDatabase, MockExecResult, RuntimeErr, Set, sea_query::OnConflict,
    };
    use uuid::Uuid;

    use crate::entity::exclusion::{ActiveModel, Column, Entity as Exclusion};

    use super::*;

    fn row(listing: &str) -> (String, ActiveModel) {
        (
            listing.to_string(),
            ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(Uuid::nil()),
                listing_external_id: Set(listing.to_string()),
                scope_item_id: Set(Uuid::nil()),
                reason: Set(None),
                created_at: Set(Utc::now().fixed_offset()),
            },
        )
    }

    fn on_conflict() -> OnConflict {
        OnConflict::columns([Column::UserId, Column::ListingExternalId, Column::ScopeItemId])
            .do_nothing()
            .to_owned()
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            rows_affected: rows,
            last_insert_id: 0,
        }
    }

    #[test]
    fn dedupe_last_keeps_latest_value_in_first_position() {
        let rows = vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("a".to_string(), 3),
        ];
        assert_eq!(
            dedupe_last(rows),
            vec![("a".to_string(), 3), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn counts_split_created_and_updated() {
        let outcome = ChunkOutcome {
            written: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            failed: vec![("d".to_string(), "constraint".to_string())],
        };
        let existing: HashSet<String> = ["b".to_string()].into_iter().collect();
        let counts = outcome.counts(&existing);
        assert_eq!(counts.created, 2);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.errors, vec!["d: constraint".to_string()]);
    }

    #[tokio::test]
    async fn upsert_chunk_is_noop_for_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let outcome = upsert_chunk::<Exclusion, _>(&db, Vec::new(), &on_conflict(), "exclusions")
            .await
            .expect("empty chunk");
        assert!(outcome.written.is_empty());
    }

    #[tokio::test]
    async fn upsert_chunk_writes_whole_batch_in_one_statement() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([exec(2)])
            .into_connection();

        let outcome = upsert_chunk::<Exclusion, _>(
            &db,
            vec![row("a"), row("b")],
            &on_conflict(),
            "exclusions",
        )
        .await
        .expect("batch upsert");

        assert_eq!(outcome.written, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn upsert_chunk_accepts_any_keyed_entity() {
        use crate::entity::item_status::{ItemStatus, MatchConfidence};
        use crate::entity::source::Source;
        use crate::entity::tracked_item;

        let now = Utc::now().fixed_offset();
        let item = tracked_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(Uuid::nil()),
            source: Set(Source::Amazon),
            external_id: Set("B000FALCON".to_string()),
            name: Set("Millennium Falcon".to_string()),
            status: Set(ItemStatus::Active),
            comparison_id: Set(None),
            match_confidence: Set(MatchConfidence::Unmatched),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let conflict = OnConflict::columns([
            tracked_item::Column::UserId,
            tracked_item::Column::ExternalId,
        ])
        .update_column(tracked_item::Column::Name)
        .to_owned();
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = upsert_chunk::<tracked_item::Entity, _>(
            &db,
            vec![("B000FALCON".to_string(), item)],
            &conflict,
            "tracked_items",
        )
        .await
        .expect("upsert");
        assert_eq!(outcome.written, vec!["B000FALCON".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_chunk_retries_transient_errors() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Conn(RuntimeErr::Internal(
                "temporarily unavailable".to_string(),
            ))])
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = upsert_chunk::<Exclusion, _>(&db, vec![row("a")], &on_conflict(), "x")
            .await
            .expect("should succeed after retry");
        assert_eq!(outcome.written.len(), 1);
    }

    #[tokio::test]
    async fn upsert_chunk_isolates_bad_rows() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Custom("CHECK constraint failed".to_string())])
            .append_exec_results([exec(1)])
            .append_exec_errors([DbErr::Custom("CHECK constraint failed".to_string())])
            .append_exec_results([exec(1)])
            .into_connection();

        let outcome = upsert_chunk::<Exclusion, _>(
            &db,
            vec![row("a"), row("b"), row("c")],
            &on_conflict(),
            "x",
        )
        .await
        .expect("partial success");

        assert_eq!(outcome.written, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "b");
    }

    #[tokio::test]
    async fn upsert_chunk_reports_systemic_failure_when_every_row_fails() {
        let err = || DbErr::Custom("no such table: exclusions".to_string());
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([err(), err(), err()])
            .into_connection();

        let result =
            upsert_chunk::<Exclusion, _>(&db, vec![row("a"), row("b")], &on_conflict(), "x").await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_is_retryable_db_error() {
        assert!(is_retryable_db_error(&DbErr::Conn(RuntimeErr::Internal(
            "refused".to_string()
        ))));
        assert!(is_retryable_db_error(&DbErr::Exec(RuntimeErr::Internal(
            "database is locked".to_string()
        ))));
        assert!(!is_retryable_db_error(&DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed".to_string()
        ))));
        assert!(!is_retryable_db_error(&DbErr::Custom("locked".to_string())));
    }
}

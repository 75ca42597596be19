//! Persistence operations over the engine's tables.
//!
//! Every write is keyed by a natural key and safe to repeat. Functions take
//! any `ConnectionTrait` so callers can run them inside a transaction.

mod bulk;
pub mod cross_listings;
mod errors;
pub mod cursors;
pub mod exclusions;
pub mod items;
pub mod jobs;
pub mod listings;
pub mod orders;
pub mod prices;
mod query;
pub mod removals;

pub use bulk::{UPSERT_CHUNK_SIZE, UpsertCounts, is_retryable_db_error};
pub use errors::{Result, StoreError};
pub use exclusions::{ExclusionScope, GLOBAL_SCOPE};
pub use jobs::JobCounts;
pub use listings::ReplaceOutcome;
pub use query::{DEFAULT_PER_PAGE, PaginatedResult, Pagination};

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_store_error_not_found_by_id() {
        let id = Uuid::new_v4();
        let err = StoreError::not_found_by_id("removal entry", id);
        let msg = err.to_string();
        assert!(msg.contains("Not found"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn test_store_error_invalid_transition() {
        let err = StoreError::invalid_transition("completed", "dismissed");
        assert_eq!(err.to_string(), "Cannot move from completed to dismissed");
        assert!(!err.is_systemic());
    }

    #[test]
    fn test_store_error_database_is_systemic() {
        let err = StoreError::from(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        assert!(err.is_systemic());
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_upsert_counts_merge() {
        let mut a = UpsertCounts {
            created: 1,
            updated: 2,
            failed: 0,
            errors: Vec::new(),
        };
        a.merge(UpsertCounts {
            created: 3,
            updated: 0,
            failed: 1,
            errors: vec!["x: bad".to_string()],
        });
        assert_eq!(a.written(), 6);
        assert_eq!(a.failed, 1);
        assert_eq!(a.errors.len(), 1);
    }
}

//! Removal queue: "sold on A, remove from B" work items.
//!
//! Entries are created `pending` and only an operator moves them to
//! `completed` or `dismissed`.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::entity::listing_status::RemovalStatus;
use crate::entity::removal_entry::{ActiveModel, Column, Entity as RemovalEntry, Model};
use crate::entity::source::Source;

use super::errors::{Result, StoreError};
use super::query::{PaginatedResult, Pagination};

/// Queue entries, skipping any that already exist for the same sale and
/// target. Returns the number of new rows.
pub async fn enqueue<C: ConnectionTrait>(db: &C, entries: Vec<ActiveModel>) -> Result<u64> {
    if entries.is_empty() {
        return Ok(0);
    }

    RemovalEntry::insert_many(entries)
        .on_conflict(
            OnConflict::columns([
                Column::CrossListingId,
                Column::SaleSource,
                Column::OrderExternalId,
                Column::RemovalTarget,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(StoreError::from)
}

/// Pending entries, oldest sale first.
pub async fn list_pending<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    pagination: Pagination,
) -> Result<PaginatedResult<Model>> {
    let paginator = RemovalEntry::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Status.eq(RemovalStatus::Pending))
        .order_by_asc(Column::SaleDate)
        .order_by_asc(Column::ItemKey)
        .order_by_asc(Column::RemovalTarget)
        .paginate(db, pagination.per_page);

    let total = paginator.num_items().await?;
    let total_pages = paginator.num_pages().await?;
    let items = paginator.fetch_page(pagination.page).await?;

    Ok(PaginatedResult {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages,
    })
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<Model> {
    RemovalEntry::find_by_id(id)
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found_by_id("removal entry", id))
}

/// Entries for one cross-listed item.
pub async fn for_cross_listing<C: ConnectionTrait>(
    db: &C,
    cross_listing_id: Uuid,
) -> Result<Vec<Model>> {
    RemovalEntry::find()
        .filter(Column::CrossListingId.eq(cross_listing_id))
        .order_by_asc(Column::RemovalTarget)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Whether any entry, in any state, was queued for this sale of the item.
pub async fn exists_for_sale<C: ConnectionTrait>(
    db: &C,
    cross_listing_id: Uuid,
    sale_source: Source,
    order_external_id: &str,
) -> Result<bool> {
    let count = RemovalEntry::find()
        .filter(Column::CrossListingId.eq(cross_listing_id))
        .filter(Column::SaleSource.eq(sale_source))
        .filter(Column::OrderExternalId.eq(order_external_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn count_pending_for<C: ConnectionTrait>(db: &C, cross_listing_id: Uuid) -> Result<u64> {
    RemovalEntry::find()
        .filter(Column::CrossListingId.eq(cross_listing_id))
        .filter(Column::Status.eq(RemovalStatus::Pending))
        .count(db)
        .await
        .map_err(StoreError::from)
}

/// Move a pending entry to a terminal state.
///
/// Fails with `InvalidTransition` if the entry is no longer pending.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    id: Uuid,
    to: RemovalStatus,
) -> Result<Model> {
    if to == RemovalStatus::Pending {
        return Err(StoreError::invalid_transition(RemovalStatus::Pending, to));
    }

    let result = RemovalEntry::update_many()
        .col_expr(Column::Status, Expr::value(to))
        .col_expr(Column::ResolvedAt, Expr::value(Some(Utc::now().fixed_offset())))
        .filter(Column::Id.eq(id))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Status.eq(RemovalStatus::Pending))
        .exec(db)
        .await?;

    let entry = find_by_id(db, user_id, id).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::invalid_transition(entry.status, to));
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    #[tokio::test]
    async fn enqueue_skips_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        assert_eq!(enqueue(&db, Vec::new()).await.unwrap(), 0);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn resolve_refuses_to_reopen() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let err = resolve(&db, Uuid::nil(), Uuid::new_v4(), RemovalStatus::Pending)
            .await
            .expect_err("pending is not terminal");
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }
}

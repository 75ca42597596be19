//! Registry of items listed on more than one source.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::entity::cross_listing::{ActiveModel, Column, Entity as CrossListing, Model};
use crate::entity::listing_status::CrossListingStatus;
use crate::entity::source::Source;

use super::errors::{Result, StoreError};

/// Register (or re-register) an item as live on `listed_on`.
///
/// Re-registering a sold item relists it: status returns to `published`.
/// The last sale stays recorded so a replay of that order is recognised
/// as already handled.
pub async fn register<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    item_key: &str,
    title: Option<String>,
    listed_on: &[Source],
) -> Result<Model> {
    let item_key = item_key.trim();
    if item_key.is_empty() {
        return Err(StoreError::invalid_input("item key must not be empty"));
    }
    if listed_on.is_empty() {
        return Err(StoreError::invalid_input(
            "an item must be listed on at least one source",
        ));
    }

    let mut sources = listed_on.to_vec();
    sources.sort();
    sources.dedup();

    let now = Utc::now().fixed_offset();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        item_key: Set(item_key.to_string()),
        title: Set(title),
        listed_on: Set(serde_json::to_value(&sources).unwrap_or_else(|_| serde_json::json!([]))),
        status: Set(CrossListingStatus::Published),
        sold_on: Set(None),
        sold_order_ref: Set(None),
        sold_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    CrossListing::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::ItemKey])
                .update_columns([
                    Column::Title,
                    Column::ListedOn,
                    Column::Status,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_by_key(db, user_id, item_key)
        .await?
        .ok_or_else(|| StoreError::not_found_by_key("cross listing", item_key))
}

pub async fn find_by_key<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    item_key: &str,
) -> Result<Option<Model>> {
    CrossListing::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ItemKey.eq(item_key))
        .one(db)
        .await
        .map_err(StoreError::from)
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Model> {
    CrossListing::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found_by_id("cross listing", id))
}

/// Details of the sale that ends an item's `published` state.
#[derive(Debug, Clone)]
pub struct SaleRecord<'a> {
    pub sold_on: Source,
    pub order_ref: &'a str,
    pub sold_at: DateTime<Utc>,
}

/// Move a `published` item to `next` because of `sale`.
///
/// The update is conditional on the row still being `published`, so two
/// concurrent reconcilers cannot both claim the same item. Returns `false`
/// when the item had already left `published`.
pub async fn claim_sale<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    sale: &SaleRecord<'_>,
    next: CrossListingStatus,
) -> Result<bool> {
    let result = CrossListing::update_many()
        .col_expr(Column::Status, Expr::value(next))
        .col_expr(Column::SoldOn, Expr::value(Some(sale.sold_on)))
        .col_expr(
            Column::SoldOrderRef,
            Expr::value(Some(sale.order_ref.to_string())),
        )
        .col_expr(Column::SoldAt, Expr::value(Some(sale.sold_at.fixed_offset())))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(CrossListingStatus::Published))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Move a `pending_removal` item to `sold`. Returns `false` if it was in
/// any other state.
pub async fn finish_sale<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool> {
    let result = CrossListing::update_many()
        .col_expr(Column::Status, Expr::value(CrossListingStatus::Sold))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(CrossListingStatus::PendingRemoval))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Registry entries for a user, optionally in one state.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    status: Option<CrossListingStatus>,
) -> Result<Vec<Model>> {
    let mut query = CrossListing::find().filter(Column::UserId.eq(user_id));
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status));
    }
    query
        .order_by_asc(Column::ItemKey)
        .all(db)
        .await
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    #[tokio::test]
    async fn register_requires_at_least_one_source() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let err = register(&db, Uuid::nil(), "75192", None, &[])
            .await
            .expect_err("no sources");
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn claim_sale_reports_lost_race() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 0,
                last_insert_id: 0,
            }])
            .into_connection();

        let sale = SaleRecord {
            sold_on: Source::Ebay,
            order_ref: "12-34567-89012",
            sold_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };
        let claimed = claim_sale(
            &db,
            Uuid::new_v4(),
            &sale,
            CrossListingStatus::PendingRemoval,
        )
        .await
        .expect("update");
        assert!(!claimed);
    }
}

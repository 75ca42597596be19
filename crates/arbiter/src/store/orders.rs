//! Platform orders keyed by `(user, source, external_id)`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::platform_order::{ActiveModel, Column, Entity as PlatformOrder, Model};
use crate::entity::source::Source;
use crate::money::{from_minor, to_minor};
use crate::platform::{CursorPosition, LineItem, NormalizedOrder};

use super::bulk::{UPSERT_CHUNK_SIZE, UpsertCounts, dedupe_last, upsert_chunk};
use super::errors::{Result, StoreError};
use super::query::{PaginatedResult, Pagination};

/// Build the active model for a normalized order.
pub fn to_active_model(user_id: Uuid, order: &NormalizedOrder, now: DateTime<Utc>) -> ActiveModel {
    let now = now.fixed_offset();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        source: Set(order.source),
        external_id: Set(order.external_id.clone()),
        order_date: Set(order.order_date.fixed_offset()),
        counterparty: Set(order.counterparty.clone()),
        status: Set(order.status.clone()),
        total_minor: Set(order.total.and_then(to_minor)),
        currency: Set(order.currency.clone()),
        line_items: Set(
            serde_json::to_value(&order.line_items).unwrap_or_else(|_| serde_json::json!([])),
        ),
        line_items_loaded: Set(order.line_items_loaded),
        source_updated_at: Set(order.updated_at.fixed_offset()),
        created_at: Set(now),
        synced_at: Set(now),
    }
}

/// ON CONFLICT clause for orders.
///
/// Rows written without their line items leave stored line items alone, so
/// a summary-only pass never erases items loaded by an earlier pass.
pub(crate) fn build_upsert_on_conflict(with_line_items: bool) -> OnConflict {
    let mut columns = vec![
        Column::OrderDate,
        Column::Counterparty,
        Column::Status,
        Column::TotalMinor,
        Column::Currency,
        Column::SourceUpdatedAt,
        Column::SyncedAt,
    ];
    if with_line_items {
        columns.push(Column::LineItems);
        columns.push(Column::LineItemsLoaded);
    }

    OnConflict::columns([Column::UserId, Column::Source, Column::ExternalId])
        .update_columns(columns)
        .to_owned()
}

/// Upsert normalized orders for one user.
///
/// All orders must come from the same source. Repeating the call with the
/// same orders leaves the same rows behind.
pub async fn upsert_orders<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    orders: &[NormalizedOrder],
) -> Result<UpsertCounts> {
    let Some(first) = orders.first() else {
        return Ok(UpsertCounts::default());
    };
    let source = first.source;
    if orders.iter().any(|o| o.source != source) {
        return Err(StoreError::invalid_input(
            "upsert_orders called with orders from more than one source",
        ));
    }

    let now = Utc::now();
    let rows = dedupe_last(
        orders
            .iter()
            .map(|o| (o.external_id.clone(), o))
            .collect(),
    );

    let mut counts = UpsertCounts::default();
    for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
        let keys: Vec<String> = chunk.iter().map(|(k, _)| k.clone()).collect();
        let existing = existing_keys(db, user_id, source, &keys).await?;

        let (loaded, summary): (Vec<_>, Vec<_>) =
            chunk.iter().partition(|(_, o)| o.line_items_loaded);

        for (group, with_items) in [(loaded, true), (summary, false)] {
            let models = group
                .into_iter()
                .map(|(k, o)| (k.clone(), to_active_model(user_id, o, now)))
                .collect();
            let outcome = upsert_chunk::<PlatformOrder, _>(
                db,
                models,
                &build_upsert_on_conflict(with_items),
                "platform_orders",
            )
            .await?;
            counts.merge(outcome.counts(&existing));
        }
    }

    tracing::debug!(
        source = %source,
        created = counts.created,
        updated = counts.updated,
        failed = counts.failed,
        "Upserted orders"
    );

    Ok(counts)
}

async fn existing_keys<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    keys: &[String],
) -> Result<HashSet<String>> {
    let found: Vec<String> = PlatformOrder::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Source.eq(source))
        .filter(Column::ExternalId.is_in(keys.iter().cloned()))
        .select_only()
        .column(Column::ExternalId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(found.into_iter().collect())
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Rows ordered after `pos`. A position without a token sorts before every
/// row sharing its timestamp, so those rows are included.
fn stream_after(pos: &CursorPosition) -> Condition {
    let at = pos.at.fixed_offset();
    match &pos.token {
        Some(token) => Condition::any()
            .add(Column::SourceUpdatedAt.gt(at))
            .add(
                Condition::all()
                    .add(Column::SourceUpdatedAt.eq(at))
                    .add(Column::ExternalId.gt(token.clone())),
            ),
        None => Condition::all().add(Column::SourceUpdatedAt.gte(at)),
    }
}

/// Find an order by its natural key.
pub async fn find_by_natural_key<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    external_id: &str,
) -> Result<Option<Model>> {
    PlatformOrder::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Source.eq(source))
        .filter(Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Orders strictly after `after` in stream order, oldest first.
///
/// Stream order is `(source_updated_at, external_id)`, matching
/// [`CursorPosition`] ordering, so a consumer can page through with its own
/// cursor without skipping rows that share a timestamp.
pub async fn find_after<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    after: Option<&CursorPosition>,
    limit: u64,
) -> Result<Vec<Model>> {
    let mut query = PlatformOrder::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Source.eq(source));

    if let Some(pos) = after {
        query = query.filter(stream_after(pos));
    }

    query
        .order_by_asc(Column::SourceUpdatedAt)
        .order_by_asc(Column::ExternalId)
        .limit(limit)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Orders for a user, newest first.
pub async fn find_page<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Option<Source>,
    pagination: Pagination,
) -> Result<PaginatedResult<Model>> {
    let mut query = PlatformOrder::find().filter(Column::UserId.eq(user_id));
    if let Some(source) = source {
        query = query.filter(Column::Source.eq(source));
    }

    let paginator = query
        .order_by_desc(Column::OrderDate)
        .order_by_asc(Column::ExternalId)
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

/// Count orders, optionally for one source.
pub async fn count<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Option<Source>,
) -> Result<u64> {
    let mut query = PlatformOrder::find().filter(Column::UserId.eq(user_id));
    if let Some(source) = source {
        query = query.filter(Column::Source.eq(source));
    }
    query.count(db).await.map_err(StoreError::from)
}

// ─── Model Helpers ───────────────────────────────────────────────────────────

/// Stream position of a stored order.
pub fn position(model: &Model) -> CursorPosition {
    CursorPosition::with_token(
        model.source_updated_at.with_timezone(&Utc),
        model.external_id.clone(),
    )
}

/// Decode the stored line items.
pub fn line_items(model: &Model) -> Result<Vec<LineItem>> {
    serde_json::from_value(model.line_items.clone()).map_err(|e| {
        StoreError::invalid_input(format!(
            "order {} has malformed line items: {e}",
            model.external_id
        ))
    })
}

/// Stored total as a decimal amount.
pub fn total(model: &Model) -> Option<rust_decimal::Decimal> {
    model.total_minor.map(from_minor)
}

/// Rebuild the normalized order a stored row came from.
pub fn to_normalized(model: &Model) -> Result<NormalizedOrder> {
    Ok(NormalizedOrder {
        source: model.source,
        external_id: model.external_id.clone(),
        order_date: model.order_date.with_timezone(&Utc),
        updated_at: model.source_updated_at.with_timezone(&Utc),
        counterparty: model.counterparty.clone(),
        status: model.status.clone(),
        total: total(model),
        currency: model.currency.clone(),
        line_items: line_items(model)?,
        line_items_loaded: model.line_items_loaded,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, QueryTrait};

    use super::*;

    fn order(id: &str, loaded: bool) -> NormalizedOrder {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        NormalizedOrder {
            source: Source::Ebay,
            external_id: id.to_string(),
            order_date: t,
            updated_at: t,
            counterparty: Some("buyer1".to_string()),
            status: "PAID".to_string(),
            total: Some(dec!(24.99)),
            currency: Some("GBP".to_string()),
            line_items: vec![LineItem {
                sku: "SYNC-75192".to_string(),
                title: None,
                quantity: 1,
                unit_price: Some(dec!(24.99)),
            }],
            line_items_loaded: loaded,
        }
    }

    #[test]
    fn active_model_stores_minor_units_and_line_items() {
        let model = to_active_model(Uuid::nil(), &order("A-100", true), Utc::now());
        assert_eq!(model.total_minor.clone().unwrap(), Some(2499));
        assert_eq!(
            model.line_items.clone().unwrap(),
            serde_json::json!([{"sku": "SYNC-75192", "quantity": 1, "unit_price": 24.99}])
        );
    }

    #[test]
    fn on_conflict_without_line_items_keeps_stored_items() {
        let sql = PlatformOrder::insert(to_active_model(
            Uuid::nil(),
            &order("A-100", false),
            Utc::now(),
        ))
        .on_conflict(build_upsert_on_conflict(false))
        .build(DatabaseBackend::Sqlite)
        .to_string();

        assert!(sql.contains("ON CONFLICT (\"user_id\", \"source\", \"external_id\")"));
        assert!(sql.contains("\"status\" = \"excluded\".\"status\""));
        assert!(!sql.contains("\"line_items\" = \"excluded\".\"line_items\""));
        assert!(!sql.contains("\"created_at\" = \"excluded\""));
    }

    #[test]
    fn untokened_position_includes_its_own_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let sql = |token: Option<&str>| {
            PlatformOrder::find()
                .filter(stream_after(&CursorPosition {
                    at,
                    token: token.map(str::to_string),
                }))
                .build(DatabaseBackend::Sqlite)
                .to_string()
        };

        assert!(sql(None).contains("\"source_updated_at\" >= '2025-03-01"));
        let tokened = sql(Some("A-100"));
        assert!(tokened.contains("\"source_updated_at\" > '2025-03-01"));
        assert!(tokened.contains("\"external_id\" > 'A-100'"));
    }

    #[test]
    fn on_conflict_with_line_items_overwrites_them() {
        let sql = PlatformOrder::insert(to_active_model(
            Uuid::nil(),
            &order("A-100", true),
            Utc::now(),
        ))
        .on_conflict(build_upsert_on_conflict(true))
        .build(DatabaseBackend::Sqlite)
        .to_string();

        assert!(sql.contains("\"line_items\" = \"excluded\".\"line_items\""));
    }

    #[tokio::test]
    async fn upsert_orders_rejects_mixed_sources() {
        let db = sea_orm::MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut other = order("B-1", true);
        other.source = Source::Amazon;

        let err = upsert_orders(&db, Uuid::nil(), &[order("A-1", true), other])
            .await
            .expect_err("mixed sources");
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }
}

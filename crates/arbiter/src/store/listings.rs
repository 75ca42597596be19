//! Competing listings observed on comparison sources.
//!
//! A comparison sync replaces an item's listings for one source wholesale:
//! rows seen this time are upserted, rows no longer seen are pruned.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::comparison_listing::{
    ActiveModel, Column, Entity as ComparisonListing, Model,
};
use crate::entity::source::Source;
use crate::money::to_minor;
use crate::platform::ObservedListing;

use super::bulk::{UPSERT_CHUNK_SIZE, UpsertCounts, dedupe_last, upsert_chunk};
use super::errors::{Result, StoreError};

/// Outcome of replacing one item's listings for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub counts: UpsertCounts,
    /// Rows deleted because the source no longer shows them.
    pub pruned: u64,
}

pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::TrackedItemId, Column::Source, Column::ExternalId])
        .update_columns([
            Column::Title,
            Column::PriceMinor,
            Column::ShippingMinor,
            Column::TotalMinor,
            Column::Currency,
            Column::Condition,
            Column::IsActive,
            Column::ObservedAt,
        ])
        .to_owned()
}

fn to_active_model(
    user_id: Uuid,
    item_id: Uuid,
    source: Source,
    listing: &ObservedListing,
    observed_at: DateTime<Utc>,
) -> Option<ActiveModel> {
    Some(ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        tracked_item_id: Set(item_id),
        source: Set(source),
        external_id: Set(listing.external_id.clone()),
        title: Set(listing.title.clone()),
        price_minor: Set(to_minor(listing.price)?),
        shipping_minor: Set(to_minor(listing.shipping)?),
        total_minor: Set(to_minor(listing.total())?),
        currency: Set(listing.currency.clone()),
        condition: Set(listing.condition.clone()),
        is_active: Set(listing.is_active),
        observed_at: Set(observed_at.fixed_offset()),
    })
}

/// Replace the listings `source` shows for one item.
///
/// Runs in one transaction so readers never see a half-replaced set.
pub async fn replace_for_item<C>(
    db: &C,
    user_id: Uuid,
    item_id: Uuid,
    source: Source,
    listings: &[ObservedListing],
) -> Result<ReplaceOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let now = Utc::now();
    let mut counts = UpsertCounts::default();

    let mut rows = Vec::with_capacity(listings.len());
    for listing in listings {
        match to_active_model(user_id, item_id, source, listing, now) {
            Some(model) => rows.push((listing.external_id.clone(), model)),
            None => {
                counts.failed += 1;
                counts
                    .errors
                    .push(format!("{}: amount out of range", listing.external_id));
            }
        }
    }
    let rows = dedupe_last(rows);
    let seen: Vec<String> = rows.iter().map(|(k, _)| k.clone()).collect();

    let txn = db.begin().await?;

    let existing: HashSet<String> = ComparisonListing::find()
        .filter(Column::TrackedItemId.eq(item_id))
        .filter(Column::Source.eq(source))
        .select_only()
        .column(Column::ExternalId)
        .into_tuple::<String>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    let mut rows = rows;
    while !rows.is_empty() {
        let rest = rows.split_off(rows.len().min(UPSERT_CHUNK_SIZE));
        let outcome = upsert_chunk::<ComparisonListing, _>(
            &txn,
            rows,
            &build_upsert_on_conflict(),
            "comparison_listings",
        )
        .await?;
        counts.merge(outcome.counts(&existing));
        rows = rest;
    }

    let stale: Vec<String> = existing
        .iter()
        .filter(|k| !seen.contains(k))
        .cloned()
        .collect();
    let mut pruned = 0u64;
    for chunk in stale.chunks(UPSERT_CHUNK_SIZE) {
        let result = ComparisonListing::delete_many()
            .filter(Column::TrackedItemId.eq(item_id))
            .filter(Column::Source.eq(source))
            .filter(Column::ExternalId.is_in(chunk.iter().cloned()))
            .exec(&txn)
            .await?;
        pruned += result.rows_affected;
    }

    txn.commit().await?;

    if pruned > 0 {
        tracing::debug!(
            source = %source,
            item = %item_id,
            pruned,
            "Pruned listings no longer observed"
        );
    }

    Ok(ReplaceOutcome { counts, pruned })
}

/// All listings for the given items, grouped by item id.
pub async fn for_items<C: ConnectionTrait>(
    db: &C,
    item_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Model>>> {
    let mut out: HashMap<Uuid, Vec<Model>> = HashMap::new();
    for chunk in item_ids.chunks(UPSERT_CHUNK_SIZE) {
        let rows = ComparisonListing::find()
            .filter(Column::TrackedItemId.is_in(chunk.iter().copied()))
            .order_by_asc(Column::TotalMinor)
            .order_by_asc(Column::ExternalId)
            .all(db)
            .await
            .map_err(StoreError::from)?;
        for row in rows {
            out.entry(row.tracked_item_id).or_default().push(row);
        }
    }
    Ok(out)
}

/// Listings for one item, cheapest first.
pub async fn for_item<C: ConnectionTrait>(db: &C, item_id: Uuid) -> Result<Vec<Model>> {
    ComparisonListing::find()
        .filter(Column::TrackedItemId.eq(item_id))
        .order_by_asc(Column::TotalMinor)
        .order_by_asc(Column::ExternalId)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Ids of items that currently show a listing with this external id.
pub async fn items_with_listing<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    listing_external_id: &str,
) -> Result<Vec<Uuid>> {
    let mut ids: Vec<Uuid> = ComparisonListing::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ExternalId.eq(listing_external_id))
        .select_only()
        .column(Column::TrackedItemId)
        .into_tuple()
        .all(db)
        .await?;
    ids.sort();
    ids.dedup();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn listing(id: &str) -> ObservedListing {
        ObservedListing {
            external_id: id.to_string(),
            title: Some("LEGO 75192".to_string()),
            price: dec!(10.00),
            shipping: dec!(3.49),
            currency: "GBP".to_string(),
            condition: Some("New".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn active_model_stores_landed_total() {
        let model =
            to_active_model(Uuid::nil(), Uuid::nil(), Source::Ebay, &listing("1"), Utc::now())
                .expect("in range");
        assert_eq!(model.price_minor.clone().unwrap(), 1000);
        assert_eq!(model.shipping_minor.clone().unwrap(), 349);
        assert_eq!(model.total_minor.clone().unwrap(), 1349);
    }

    #[test]
    fn active_model_rejects_out_of_range_amounts() {
        let huge = ObservedListing {
            price: rust_decimal::Decimal::MAX,
            ..listing("1")
        };
        assert!(
            to_active_model(Uuid::nil(), Uuid::nil(), Source::Ebay, &huge, Utc::now()).is_none()
        );
    }
}

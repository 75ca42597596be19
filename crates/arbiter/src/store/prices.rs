//! Latest price snapshot per `(tracked_item, source)`.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::price_observation::{
    ActiveModel, Column, Entity as PriceObservation, Model,
};
use crate::entity::source::Source;
use crate::money::to_minor;
use crate::platform::PriceSnapshot;

use super::bulk::{UPSERT_CHUNK_SIZE, UpsertCounts, dedupe_last, upsert_chunk};
use super::errors::{Result, StoreError};

pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::TrackedItemId, Column::Source])
        .update_columns([
            Column::PriceMinor,
            Column::Currency,
            Column::OfferCount,
            Column::SecondaryMetric,
            Column::ObservedAt,
            Column::UpdatedAt,
        ])
        .to_owned()
}

fn to_active_model(item_id: Uuid, source: Source, snapshot: &PriceSnapshot) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        tracked_item_id: Set(item_id),
        source: Set(source),
        price_minor: Set(snapshot.price.and_then(to_minor)),
        currency: Set(snapshot.currency.clone()),
        offer_count: Set(snapshot.offer_count),
        secondary_metric: Set(snapshot.secondary_metric),
        observed_at: Set(snapshot.observed_at.fixed_offset()),
        updated_at: Set(Utc::now().fixed_offset()),
    }
}

/// Overwrite the observation slot for each `(item, snapshot)` pair.
pub async fn upsert_observations<C: ConnectionTrait>(
    db: &C,
    source: Source,
    observations: &[(Uuid, PriceSnapshot)],
) -> Result<UpsertCounts> {
    let rows = dedupe_last(
        observations
            .iter()
            .map(|(item_id, snap)| (item_id.to_string(), (*item_id, snap)))
            .collect(),
    );

    let mut counts = UpsertCounts::default();
    for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
        let ids: Vec<Uuid> = chunk.iter().map(|(_, (id, _))| *id).collect();
        let existing: HashSet<String> = PriceObservation::find()
            .filter(Column::Source.eq(source))
            .filter(Column::TrackedItemId.is_in(ids))
            .select_only()
            .column(Column::TrackedItemId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?
            .into_iter()
            .map(|id| id.to_string())
            .collect();

        let models = chunk
            .iter()
            .map(|(key, (id, snap))| (key.clone(), to_active_model(*id, source, snap)))
            .collect();
        let outcome = upsert_chunk::<PriceObservation, _>(
            db,
            models,
            &build_upsert_on_conflict(),
            "price_observations",
        )
        .await?;
        counts.merge(outcome.counts(&existing));
    }

    Ok(counts)
}

/// Observations from `source` for the given items, keyed by item id.
pub async fn for_items<C: ConnectionTrait>(
    db: &C,
    source: Source,
    item_ids: &[Uuid],
) -> Result<HashMap<Uuid, Model>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut out = HashMap::with_capacity(item_ids.len());
    for chunk in item_ids.chunks(UPSERT_CHUNK_SIZE) {
        let rows = PriceObservation::find()
            .filter(Column::Source.eq(source))
            .filter(Column::TrackedItemId.is_in(chunk.iter().copied()))
            .all(db)
            .await
            .map_err(StoreError::from)?;
        out.extend(rows.into_iter().map(|m| (m.tracked_item_id, m)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, QueryTrait};

    use super::*;

    #[test]
    fn unavailable_price_is_stored_as_null() {
        let snap = PriceSnapshot {
            external_id: "B07FNW9FGJ".to_string(),
            price: None,
            currency: "GBP".to_string(),
            offer_count: Some(0),
            secondary_metric: Some(1520),
            observed_at: Utc::now(),
        };
        let model = to_active_model(Uuid::nil(), Source::Keepa, &snap);
        assert_eq!(model.price_minor.clone().unwrap(), None);

        let priced = PriceSnapshot {
            price: Some(dec!(649.99)),
            ..snap
        };
        let model = to_active_model(Uuid::nil(), Source::Keepa, &priced);
        assert_eq!(model.price_minor.clone().unwrap(), Some(64999));
    }

    #[test]
    fn on_conflict_targets_item_and_source() {
        let snap = PriceSnapshot {
            external_id: "x".to_string(),
            price: None,
            currency: "GBP".to_string(),
            offer_count: None,
            secondary_metric: None,
            observed_at: Utc::now(),
        };
        let sql = PriceObservation::insert(to_active_model(Uuid::nil(), Source::Keepa, &snap))
            .on_conflict(build_upsert_on_conflict())
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.contains("ON CONFLICT (\"tracked_item_id\", \"source\")"));
        assert!(sql.contains("\"price_minor\" = \"excluded\".\"price_minor\""));
    }
}

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::source::Source;
use crate::entity::tracked_item;
use crate::money::from_minor;
use crate::store::{
    self, ExclusionScope, PaginatedResult, Pagination, exclusions, items, listings, prices,
};
use crate::sync::EngineContext;

use super::arena::{ArenaListing, ExclusionSet, ListingArena};
use super::view::{ArbitrageFilter, ArbitrageSort, ItemMargins};

/// Source whose price observation is the sell price by default.
pub const DEFAULT_SELL_SOURCE: Source = Source::Keepa;

/// Result of adding or removing an exclusion.
#[derive(Debug, Clone)]
pub struct ExclusionChange {
    /// `false` when the exclusion already existed (add) or was absent (remove).
    pub changed: bool,
    /// Fresh margins for every item the exclusion can affect.
    pub recalculated: Vec<ItemMargins>,
}

/// Computes margins from the stored listings, observations and exclusions.
///
/// Nothing computed here is persisted. Every call reads the current rows, so
/// a change to the exclusion set or a comparison sync is reflected on the
/// next read.
#[derive(Clone)]
pub struct ArbitrageCalculator {
    ctx: EngineContext,
    sell_source: Source,
}

impl ArbitrageCalculator {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            sell_source: DEFAULT_SELL_SOURCE,
        }
    }

    #[must_use]
    pub fn with_sell_source(mut self, source: Source) -> Self {
        self.sell_source = source;
        self
    }

    pub fn sell_source(&self) -> Source {
        self.sell_source
    }

    /// Margins for one item.
    pub async fn item_margins(&self, item_id: Uuid) -> store::Result<ItemMargins> {
        let item = items::find_by_id(self.ctx.db(), self.ctx.user_id(), item_id).await?;
        let mut out = self.compute_for(vec![item]).await?;
        out.pop()
            .ok_or_else(|| store::StoreError::not_found_by_id("tracked item", item_id))
    }

    /// Margins for every active item that passes `filter`, sorted and paged.
    #[tracing::instrument(skip_all, fields(sort = ?sort, page = pagination.page))]
    pub async fn view(
        &self,
        filter: &ArbitrageFilter,
        sort: ArbitrageSort,
        pagination: Pagination,
    ) -> store::Result<PaginatedResult<ItemMargins>> {
        let active = items::list_active(self.ctx.db(), self.ctx.user_id(), None).await?;
        let total_items = active.len();

        let mut rows: Vec<ItemMargins> = self
            .compute_for(active)
            .await?
            .into_iter()
            .filter(|m| filter.matches(m))
            .collect();
        sort.sort(&mut rows);

        tracing::debug!(items = total_items, matched = rows.len(), "Arbitrage view computed");
        Ok(PaginatedResult::from_vec(rows, pagination))
    }

    /// Exclude a listing id and recompute the items it touches.
    pub async fn exclude(
        &self,
        listing_external_id: &str,
        scope: ExclusionScope,
        reason: Option<String>,
    ) -> store::Result<ExclusionChange> {
        let changed = exclusions::add(
            self.ctx.db(),
            self.ctx.user_id(),
            listing_external_id,
            scope,
            reason,
        )
        .await?;
        tracing::info!(listing = %listing_external_id.trim(), scope = %scope, changed, "Exclusion added");
        self.recalculate(listing_external_id, scope, changed).await
    }

    /// Lift an exclusion and recompute the items it touches.
    pub async fn restore(
        &self,
        listing_external_id: &str,
        scope: ExclusionScope,
    ) -> store::Result<ExclusionChange> {
        let changed = exclusions::remove(
            self.ctx.db(),
            self.ctx.user_id(),
            listing_external_id,
            scope,
        )
        .await?;
        tracing::info!(listing = %listing_external_id.trim(), scope = %scope, changed, "Exclusion removed");
        self.recalculate(listing_external_id, scope, changed).await
    }

    async fn recalculate(
        &self,
        listing_external_id: &str,
        scope: ExclusionScope,
        changed: bool,
    ) -> store::Result<ExclusionChange> {
        let db = self.ctx.db();
        let user_id = self.ctx.user_id();

        let affected = match scope {
            ExclusionScope::Item(id) => vec![id],
            ExclusionScope::Global => {
                listings::items_with_listing(db, user_id, listing_external_id.trim()).await?
            }
        };

        let mut models = Vec::with_capacity(affected.len());
        for id in affected {
            match items::find_by_id(db, user_id, id).await {
                Ok(item) => models.push(item),
                // Scoped to an item that no longer exists: nothing to show.
                Err(store::StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(ExclusionChange {
            changed,
            recalculated: self.compute_for(models).await?,
        })
    }

    async fn compute_for(&self, items: Vec<tracked_item::Model>) -> store::Result<Vec<ItemMargins>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.ctx.db();
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        let listing_rows = listings::for_items(db, &ids).await?;
        let arena = ListingArena::new(
            listing_rows
                .into_values()
                .flatten()
                .map(ArenaListing::from),
        );
        let exclusions = ExclusionSet::new(exclusions::for_items(db, self.ctx.user_id(), &ids).await?);
        let sell_prices: HashMap<Uuid, Decimal> = prices::for_items(db, self.sell_source, &ids)
            .await?
            .into_iter()
            .filter_map(|(id, obs)| obs.price_minor.map(|p| (id, from_minor(p))))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| {
                let sell = sell_prices.get(&item.id).copied();
                ItemMargins::compute(item, sell, &arena, &exclusions)
            })
            .collect())
    }
}

//! Per-item margins and the filter/sort rules of the arbitrage listing view.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::entity::source::Source;
use crate::entity::tracked_item;

use super::arena::{ExclusionSet, ListingArena};
use super::calc::MarginSummary;

/// Recomputed margins for one tracked item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMargins {
    pub item: tracked_item::Model,
    pub sell_price: Option<Decimal>,
    /// Across every comparison source.
    pub overall: MarginSummary,
    pub by_source: BTreeMap<Source, MarginSummary>,
    /// Listings dropped by exclusions.
    pub excluded: usize,
}

impl ItemMargins {
    /// Compute an item's margins from the current listings and exclusions.
    ///
    /// Inactive and excluded listings never contribute.
    pub fn compute(
        item: tracked_item::Model,
        sell_price: Option<Decimal>,
        arena: &ListingArena,
        exclusions: &ExclusionSet,
    ) -> Self {
        let mut excluded = 0;
        let mut all = Vec::new();
        let mut per_source: BTreeMap<Source, Vec<Decimal>> = BTreeMap::new();

        for listing in arena.for_item(item.id).filter(|l| l.is_active) {
            if exclusions.is_excluded(item.id, &listing.external_id) {
                excluded += 1;
                continue;
            }
            all.push(listing.total);
            per_source
                .entry(listing.source)
                .or_default()
                .push(listing.total);
        }

        let by_source = per_source
            .into_iter()
            .map(|(source, costs)| (source, MarginSummary::compute(sell_price, &costs)))
            .collect();

        Self {
            overall: MarginSummary::compute(sell_price, &all),
            by_source,
            excluded,
            sell_price,
            item,
        }
    }

    /// Summary for one source, or the overall one when `source` is `None`.
    pub fn summary(&self, source: Option<Source>) -> Option<&MarginSummary> {
        match source {
            Some(source) => self.by_source.get(&source),
            None => Some(&self.overall),
        }
    }
}

/// Whether an item has any comparison data left after exclusions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataFilter {
    #[default]
    Any,
    HasData,
    MissingData,
}

/// Filters of the arbitrage view. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArbitrageFilter {
    /// Opportunities: margin percent at or above this.
    pub min_margin_pct: Option<Decimal>,
    /// Cost of goods percent at or below this.
    pub max_cog_pct: Option<Decimal>,
    /// Source the COG threshold is checked against; overall when `None`.
    pub cog_source: Option<Source>,
    pub data: DataFilter,
    /// Case-insensitive match on name, external id or comparison id.
    pub search: Option<String>,
}

impl ArbitrageFilter {
    pub fn matches(&self, margins: &ItemMargins) -> bool {
        if let Some(min) = self.min_margin_pct
            && margins.overall.margin_pct.is_none_or(|m| m < min)
        {
            return false;
        }

        if let Some(max) = self.max_cog_pct
            && margins
                .summary(self.cog_source)
                .and_then(|s| s.cog_pct)
                .is_none_or(|c| c > max)
        {
            return false;
        }

        match self.data {
            DataFilter::Any => {}
            DataFilter::HasData if !margins.overall.has_data() => return false,
            DataFilter::MissingData if margins.overall.has_data() => return false,
            _ => {}
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let item = &margins.item;
                [
                    Some(item.name.as_str()),
                    Some(item.external_id.as_str()),
                    item.comparison_id.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Sort order of the arbitrage view. Items without the sorted figure go
/// last in every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArbitrageSort {
    #[default]
    MarginDesc,
    MarginAsc,
    CogAsc,
    Name,
}

impl std::str::FromStr for ArbitrageSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "margin" | "margin-desc" => Ok(Self::MarginDesc),
            "margin-asc" => Ok(Self::MarginAsc),
            "cog" | "cog-asc" => Ok(Self::CogAsc),
            "name" => Ok(Self::Name),
            _ => Err(format!("Unknown sort: {}", s)),
        }
    }
}

impl ArbitrageSort {
    pub fn sort(self, rows: &mut [ItemMargins]) {
        rows.sort_by(|a, b| {
            let primary = match self {
                Self::MarginDesc => {
                    nones_last(a.overall.margin_pct, b.overall.margin_pct, |x, y| y.cmp(x))
                }
                Self::MarginAsc => {
                    nones_last(a.overall.margin_pct, b.overall.margin_pct, |x, y| x.cmp(y))
                }
                Self::CogAsc => nones_last(a.overall.cog_pct, b.overall.cog_pct, |x, y| x.cmp(y)),
                Self::Name => Ordering::Equal,
            };
            primary
                .then_with(|| a.item.name.cmp(&b.item.name))
                .then_with(|| a.item.external_id.cmp(&b.item.external_id))
        });
    }
}

fn nones_last(
    a: Option<Decimal>,
    b: Option<Decimal>,
    cmp: impl Fn(&Decimal, &Decimal) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

//! Listings and exclusions loaded once, indexed by item.
//!
//! Listings live in one flat arena; each item keeps the indices of its own
//! listings. Recomputing an item is a read of its slice plus an exclusion
//! lookup per listing.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::{comparison_listing, exclusion, source::Source};
use crate::money::from_minor;
use crate::store::GLOBAL_SCOPE;

/// The fields of a comparison listing the calculator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaListing {
    pub item_id: Uuid,
    pub source: Source,
    pub external_id: String,
    pub total: Decimal,
    pub is_active: bool,
}

impl From<comparison_listing::Model> for ArenaListing {
    fn from(model: comparison_listing::Model) -> Self {
        Self {
            item_id: model.tracked_item_id,
            source: model.source,
            external_id: model.external_id,
            total: from_minor(model.total_minor),
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Default)]
pub struct ListingArena {
    listings: Vec<ArenaListing>,
    by_item: HashMap<Uuid, Vec<usize>>,
}

impl ListingArena {
    pub fn new(listings: impl IntoIterator<Item = ArenaListing>) -> Self {
        let mut arena = Self::default();
        for listing in listings {
            arena
                .by_item
                .entry(listing.item_id)
                .or_default()
                .push(arena.listings.len());
            arena.listings.push(listing);
        }
        arena
    }

    pub fn for_item(&self, item_id: Uuid) -> impl Iterator<Item = &ArenaListing> {
        self.by_item
            .get(&item_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.listings[idx])
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// A user's exclusions, split by scope.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    global: HashSet<String>,
    scoped: HashSet<(Uuid, String)>,
}

impl ExclusionSet {
    pub fn new(exclusions: impl IntoIterator<Item = exclusion::Model>) -> Self {
        let mut set = Self::default();
        for ex in exclusions {
            set.insert(ex.scope_item_id, ex.listing_external_id);
        }
        set
    }

    /// Add an exclusion; the nil scope id means global.
    pub fn insert(&mut self, scope_item_id: Uuid, listing_id: String) {
        if scope_item_id == GLOBAL_SCOPE {
            self.global.insert(listing_id);
        } else {
            self.scoped.insert((scope_item_id, listing_id));
        }
    }

    /// Excluded in either scope.
    pub fn is_excluded(&self, item_id: Uuid, listing_id: &str) -> bool {
        self.global.contains(listing_id) || self.scoped.contains(&(item_id, listing_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.scoped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing(item: Uuid, id: &str, total: Decimal) -> ArenaListing {
        ArenaListing {
            item_id: item,
            source: Source::Ebay,
            external_id: id.to_string(),
            total,
            is_active: true,
        }
    }

    #[test]
    fn arena_indexes_by_item() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let arena = ListingArena::new([
            listing(a, "1", dec!(10)),
            listing(b, "2", dec!(11)),
            listing(a, "3", dec!(12)),
        ]);

        let ids: Vec<&str> = arena.for_item(a).map(|l| l.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(arena.for_item(Uuid::new_v4()).count(), 0);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn exclusions_apply_globally_or_per_item() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut set = ExclusionSet::default();
        set.insert(GLOBAL_SCOPE, "spam".to_string());
        set.insert(a, "noisy".to_string());

        assert!(set.is_excluded(a, "spam"));
        assert!(set.is_excluded(b, "spam"));
        assert!(set.is_excluded(a, "noisy"));
        assert!(!set.is_excluded(b, "noisy"));
        assert_eq!(set.len(), 2);
    }
}

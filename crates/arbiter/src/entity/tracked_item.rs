//! TrackedItem entity - a catalog entry under price and margin observation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::item_status::{ItemStatus, MatchConfidence};
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracked_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Source the item is sold on (its "sell" side, usually Amazon).
    pub source: Source,
    /// Stable identifier on that source (ASIN, SKU).
    pub external_id: String,
    pub name: String,

    // ─── Lifecycle ───────────────────────────────────────────────────────────
    pub status: ItemStatus,
    /// Identifier used to look up comparison listings (e.g. a set number).
    pub comparison_id: Option<String>,
    pub match_confidence: MatchConfidence,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_observation::Entity")]
    PriceObservation,
    #[sea_orm(has_many = "super::comparison_listing::Entity")]
    ComparisonListing,
}

impl Related<super::price_observation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceObservation.def()
    }
}

impl Related<super::comparison_listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ComparisonListing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the item still participates in price sync and arbitrage views.
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

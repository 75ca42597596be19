//! ComparisonListing entity - one competing listing observed for a tracked item.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comparison_listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub tracked_item_id: Uuid,
    pub source: Source,
    /// Listing identifier on the comparison source; exclusions refer to it.
    pub external_id: String,
    pub title: Option<String>,

    // ─── Money (minor units) ─────────────────────────────────────────────────
    pub price_minor: i64,
    pub shipping_minor: i64,
    /// Landed cost: price plus shipping and fees.
    pub total_minor: i64,
    pub currency: String,

    pub condition: Option<String>,
    pub is_active: bool,
    pub observed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tracked_item::Entity",
        from = "Column::TrackedItemId",
        to = "super::tracked_item::Column::Id"
    )]
    TrackedItem,
}

impl Related<super::tracked_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackedItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! PriceObservation entity - one source's latest snapshot for a tracked item.
//!
//! There is exactly one row per (tracked item, source); every price sync
//! overwrites it in place.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_observations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tracked_item_id: Uuid,
    pub source: Source,

    /// Price in minor currency units; `None` when the source had no price.
    pub price_minor: Option<i64>,
    pub currency: String,
    /// Offer count or quantity available.
    pub offer_count: Option<i32>,
    /// Source-specific secondary metric (sales rank, listing count).
    pub secondary_metric: Option<i64>,

    pub observed_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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

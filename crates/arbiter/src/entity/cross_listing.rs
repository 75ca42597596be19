//! CrossListing entity - an item listed simultaneously on several sources.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::listing_status::CrossListingStatus;
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cross_listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// Key shared by every listing of the item (the SKU without its prefix).
    pub item_key: String,
    pub title: Option<String>,
    /// JSON array of sources the item is live on.
    #[sea_orm(column_type = "Json")]
    pub listed_on: serde_json::Value,

    pub status: CrossListingStatus,
    pub sold_on: Option<Source>,
    pub sold_order_ref: Option<String>,
    pub sold_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::removal_entry::Entity")]
    RemovalEntry,
}

impl Related<super::removal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RemovalEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Sources decoded from the `listed_on` JSON column. Unknown names are dropped.
    pub fn listed_sources(&self) -> Vec<Source> {
        serde_json::from_value::<Vec<Source>>(self.listed_on.clone()).unwrap_or_default()
    }

    /// Whether the most recent recorded sale is `order_ref` on `source`.
    ///
    /// Survives a relist, so it identifies a replayed order.
    pub fn last_sale_is(&self, source: Source, order_ref: &str) -> bool {
        self.sold_on == Some(source) && self.sold_order_ref.as_deref() == Some(order_ref)
    }
}

//! RemovalEntry entity - "sold on A, remove from B" work item.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::listing_status::RemovalStatus;
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "removal_queue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub cross_listing_id: Uuid,
    pub item_key: String,

    pub sale_source: Source,
    pub removal_target: Source,
    pub order_external_id: String,
    pub sale_price_minor: Option<i64>,
    pub currency: Option<String>,
    pub sale_date: DateTimeWithTimeZone,

    pub status: RemovalStatus,
    pub created_at: DateTimeWithTimeZone,
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cross_listing::Entity",
        from = "Column::CrossListingId",
        to = "super::cross_listing::Column::Id"
    )]
    CrossListing,
}

impl Related<super::cross_listing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CrossListing.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! PlatformOrder entity - a normalized sale event from one source.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "platform_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,

    // ─── Natural Key ─────────────────────────────────────────────────────────
    pub source: Source,
    pub external_id: String,

    // ─── Order ───────────────────────────────────────────────────────────────
    pub order_date: DateTimeWithTimeZone,
    /// Buyer or seller reference on the source.
    pub counterparty: Option<String>,
    pub status: String,
    pub total_minor: Option<i64>,
    pub currency: Option<String>,
    /// Line items as a JSON array of `LineItem`.
    #[sea_orm(column_type = "Json")]
    pub line_items: serde_json::Value,
    pub line_items_loaded: bool,

    // ─── Stream Position ─────────────────────────────────────────────────────
    /// Last-modified time reported by the source; cursors are built from it.
    pub source_updated_at: DateTimeWithTimeZone,

    // ─── Tracking ────────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

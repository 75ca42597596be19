//! SyncCursor entity - durable watermark per (user, source, job type).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::job_type::JobType;
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_cursors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: Source,
    pub job_type: JobType,

    /// Timestamp component of the watermark.
    pub position_at: DateTimeWithTimeZone,
    /// Tie-breaker within `position_at` (an external id or opaque token).
    pub position_token: Option<String>,

    /// Set once a historical import has exhausted its requested range.
    pub historical_completed_at: Option<DateTimeWithTimeZone>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

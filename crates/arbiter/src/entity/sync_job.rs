//! SyncJob entity - append-only history of job executions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::job_type::{JobStatus, JobType};
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: Source,
    pub job_type: JobType,
    pub status: JobStatus,

    pub started_at: DateTimeWithTimeZone,
    pub finished_at: Option<DateTimeWithTimeZone>,
    pub duration_ms: Option<i64>,

    // ─── Counts ──────────────────────────────────────────────────────────────
    pub processed: i32,
    pub created: i32,
    pub updated: i32,
    pub failed: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_summary: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

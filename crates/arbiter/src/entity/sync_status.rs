//! SyncStatus entity - latest run per (user, source, job type).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::job_type::{JobStatus, JobType};
use crate::entity::source::Source;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: Source,
    pub job_type: JobType,

    pub last_job_id: Uuid,
    pub status: JobStatus,
    pub last_run_at: DateTimeWithTimeZone,
    pub last_success_at: Option<DateTimeWithTimeZone>,
    pub last_duration_ms: Option<i64>,

    pub processed: i32,
    pub created: i32,
    pub updated: i32,
    pub failed: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

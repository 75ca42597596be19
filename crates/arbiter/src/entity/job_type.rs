//! Job type and job status enums shared by cursors, history and status rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The kind of work a sync job performs.
///
/// Each (user, source, job type) combination owns its own cursor row and its
/// own "latest status" row, so jobs of different types never interfere.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[sea_orm(string_value = "order_sync")]
    OrderSync,
    #[sea_orm(string_value = "price_sync")]
    PriceSync,
    #[sea_orm(string_value = "comparison_sync")]
    ComparisonSync,
    #[sea_orm(string_value = "reconciliation")]
    Reconciliation,
    #[sea_orm(string_value = "historical_import")]
    HistoricalImport,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::OrderSync => "order_sync",
            JobType::PriceSync => "price_sync",
            JobType::ComparisonSync => "comparison_sync",
            JobType::Reconciliation => "reconciliation",
            JobType::HistoricalImport => "historical_import",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "order_sync" | "orders" => Ok(JobType::OrderSync),
            "price_sync" | "prices" => Ok(JobType::PriceSync),
            "comparison_sync" | "comparisons" => Ok(JobType::ComparisonSync),
            "reconciliation" | "reconcile" => Ok(JobType::Reconciliation),
            "historical_import" | "historical" => Ok(JobType::HistoricalImport),
            _ => Err(format!("Unknown job type: {}", s)),
        }
    }
}

/// Lifecycle of one job execution.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_from_str_accepts_short_names() {
        assert_eq!("orders".parse::<JobType>().unwrap(), JobType::OrderSync);
        assert_eq!(
            "historical-import".parse::<JobType>().unwrap(),
            JobType::HistoricalImport
        );
        assert!("cleanup".parse::<JobType>().is_err());
    }

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Running.to_string(), "running");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }
}

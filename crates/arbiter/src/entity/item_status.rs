//! Lifecycle and match-quality enums for tracked items.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a tracked item is still under price observation.
///
/// Items are never hard-deleted; excluding one only flips this flag.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "excluded")]
    Excluded,
}

/// How confident the link between a tracked item and its comparison id is.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    /// Identifier matched exactly (e.g. set number embedded in the title).
    #[sea_orm(string_value = "exact")]
    Exact,
    /// Heuristic match that has not been confirmed.
    #[sea_orm(string_value = "likely")]
    Likely,
    /// Set by an operator.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// No comparison id has been linked yet.
    #[sea_orm(string_value = "none")]
    Unmatched,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Active => write!(f, "active"),
            ItemStatus::Excluded => write!(f, "excluded"),
        }
    }
}

impl std::fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchConfidence::Exact => write!(f, "exact"),
            MatchConfidence::Likely => write!(f, "likely"),
            MatchConfidence::Manual => write!(f, "manual"),
            MatchConfidence::Unmatched => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for MatchConfidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(MatchConfidence::Exact),
            "likely" => Ok(MatchConfidence::Likely),
            "manual" => Ok(MatchConfidence::Manual),
            "none" => Ok(MatchConfidence::Unmatched),
            _ => Err(format!("Unknown match confidence: {}", s)),
        }
    }
}

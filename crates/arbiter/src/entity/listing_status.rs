//! State enums for the cross-listing registry and the removal queue.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Listing state of an item that is listed on more than one source.
///
/// `Published` moves to `PendingRemoval` when a sale is detected on one
/// source; it moves to `Sold` once every removal entry for that sale has been
/// resolved by an operator. The selling source is kept in `sold_on`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CrossListingStatus {
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "pending_removal")]
    PendingRemoval,
    #[sea_orm(string_value = "sold")]
    Sold,
}

/// State of one "remove from source B" work item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum RemovalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl std::fmt::Display for CrossListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrossListingStatus::Published => write!(f, "published"),
            CrossListingStatus::PendingRemoval => write!(f, "pending_removal"),
            CrossListingStatus::Sold => write!(f, "sold"),
        }
    }
}

impl std::fmt::Display for RemovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalStatus::Pending => write!(f, "pending"),
            RemovalStatus::Completed => write!(f, "completed"),
            RemovalStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

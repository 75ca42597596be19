//! Source enum for type-safe marketplace handling.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// External marketplaces and data providers the engine syncs from.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Amazon Seller Central orders.
    #[sea_orm(string_value = "amazon")]
    Amazon,
    /// eBay orders and search-result comparison listings.
    #[sea_orm(string_value = "ebay")]
    Ebay,
    /// BrickLink store orders and price guide listings.
    #[sea_orm(string_value = "bricklink")]
    BrickLink,
    /// Keepa price history (buy box, offer counts, sales rank).
    #[sea_orm(string_value = "keepa")]
    Keepa,
}

impl Source {
    /// Every known source, in display order.
    pub const ALL: [Source; 4] = [
        Source::Amazon,
        Source::Ebay,
        Source::BrickLink,
        Source::Keepa,
    ];

    /// Lowercase identifier used in config keys, cursor rows and error prefixes.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Amazon => "amazon",
            Source::Ebay => "ebay",
            Source::BrickLink => "bricklink",
            Source::Keepa => "keepa",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amazon" | "amz" => Ok(Source::Amazon),
            "ebay" => Ok(Source::Ebay),
            "bricklink" | "bl" => Ok(Source::BrickLink),
            "keepa" => Ok(Source::Keepa),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

//! eBay order and comparison-listing source.
//!
//! Orders come from the Sell Fulfillment API with their line items inline.
//! Competing listings come from Browse API searches and are priced at
//! landed cost (item price plus the first shipping option).

mod client;
mod convert;
mod error;
mod types;

pub use client::{EBAY_API_URL, EBAY_GB, EbayAdapter};
pub use convert::{to_normalized_order, to_observed_listing};
pub use error::EbayError;
pub use types::{EbayItemSummary, EbayMoney, EbayOrder};

//! BrickLink order and price guide source.
//!
//! Orders come from the store API and need a second call for their lots.
//! Competing listings are the rows of the current-stock price guide for a
//! set. Every request is signed with OAuth 1.0a (see [`oauth`]).

mod client;
mod convert;
mod error;
pub mod oauth;
mod types;

pub use client::{BRICKLINK_API_URL, BrickLinkAdapter};
pub use convert::{to_line_items, to_normalized_order, to_observed_listing};
pub use error::BrickLinkError;
pub use oauth::OAuthCredentials;
pub use types::{BrickLinkOrder, BrickLinkOrderItem, PriceGuide};

//! Keepa price source.
//!
//! Keepa serves Amazon buy-box prices, offer counts and sales ranks for
//! batches of up to ten ASINs per request, metered by a token budget that
//! refills every minute.
//!
//! # Module Structure
//!
//! - [`error`] - Client construction errors
//! - [`types`] - Wire structs for the `/product` endpoint
//! - [`client`] - The [`KeepaAdapter`] source implementation
//! - [`convert`] - Pence and Keepa-minute conversions
//!
//! # Example
//!
//! ```ignore
//! use arbiter::keepa::{KeepaAdapter, DOMAIN_UK};
//! use arbiter::platform::{BudgetConfig, RateLimitedClient};
//!
//! let adapter = KeepaAdapter::new("api-key", DOMAIN_UK)?;
//! let client = RateLimitedClient::new(adapter, BudgetConfig::for_source(Source::Keepa));
//! let products = client.fetch_batch(&asins).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DOMAIN_UK, KEEPA_API_URL, KeepaAdapter};
pub use convert::{
    KEEPA_EPOCH_MINUTES, keepa_minutes_to_datetime, pence_to_amount, to_price_snapshot,
};
pub use error::KeepaError;
pub use types::{KeepaProduct, KeepaResponse, KeepaStats};

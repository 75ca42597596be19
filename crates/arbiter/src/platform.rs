//! Source-agnostic adapter trait and the rate-limited client wrapper.
//!
//! Every marketplace is reached through a [`SourceAdapter`]. Adapters only
//! translate: they turn engine requests into source calls and source records
//! into normalized records. Budgeting and throttle recovery live in
//! [`RateLimitedClient`], which wraps any adapter and is itself an adapter.
//!
//! # Example
//!
//! ```ignore
//! use arbiter::platform::{BudgetConfig, RateLimitedClient, SourceAdapter};
//!
//! let client = RateLimitedClient::new(adapter, BudgetConfig::for_source(Source::Keepa));
//! for chunk in asins.chunks(client.max_batch_size()) {
//!     let fetched = client.fetch_batch(chunk).await?;
//!     for raw in &fetched.data {
//!         let snapshot = client.normalize_price(raw)?;
//!     }
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{BudgetConfig, RateLimitedClient, TokenBucket, rate_limits};
pub use types::{
    Capabilities, CursorPosition, Fetched, LineItem, LineItemMode, NormalizedOrder,
    ObservedListing, OrderFilter, OrderPage, PriceSnapshot, RawRecord, SourceAdapter,
};

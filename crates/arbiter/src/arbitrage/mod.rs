//! Margin and cost-of-goods computation over comparison listings.
//!
//! Margins are always derived from the current rows: the sell price is the
//! latest observation from the sell source, the cost is the cheapest active
//! comparison listing's landed total that no exclusion hides. There is no
//! stored margin column to go stale.
//!
//! ```text
//! margin     = sell - min_cost
//! margin_pct = margin / sell * 100
//! cog_pct    = min_cost / sell * 100
//! ```

mod arena;
mod calc;
mod calculator;
mod view;

pub use arena::{ArenaListing, ExclusionSet, ListingArena};
pub use calc::MarginSummary;
pub use calculator::{ArbitrageCalculator, DEFAULT_SELL_SOURCE, ExclusionChange};
pub use view::{ArbitrageFilter, ArbitrageSort, DataFilter, ItemMargins};

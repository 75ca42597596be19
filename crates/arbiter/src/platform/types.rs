use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::source::Source;

use super::errors::{PlatformError, Result};

/// A raw record as returned by a source, before normalization.
///
/// Adapters keep their typed wire structs private and hand records around as
/// JSON so the coordinator can drive any source through `dyn SourceAdapter`.
pub type RawRecord = serde_json::Value;

/// A response from a billable call, with the source's remaining budget.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    /// Authoritative remaining token count, if the source reports one.
    pub tokens_left: Option<f64>,
}

impl<T> Fetched<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            tokens_left: None,
        }
    }

    pub fn with_tokens(data: T, tokens_left: Option<f64>) -> Self {
        Self { data, tokens_left }
    }
}

/// Durable position in a source's record stream.
///
/// Ordered by timestamp first, then by token. The token breaks ties between
/// records sharing one timestamp (usually the record's external id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CursorPosition {
    pub at: DateTime<Utc>,
    pub token: Option<String>,
}

impl CursorPosition {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self { at, token: None }
    }

    pub fn with_token(at: DateTime<Utc>, token: impl Into<String>) -> Self {
        Self {
            at,
            token: Some(token.into()),
        }
    }
}

/// Source-agnostic description of which orders to fetch.
///
/// Adapters translate this into their own query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Only orders modified at or after this instant.
    pub updated_since: Option<DateTime<Utc>>,
    /// Only orders created within `[created_from, created_to]` (historical import).
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// Opaque continuation token from the previous page.
    pub page_token: Option<String>,
}

impl OrderFilter {
    /// Filter for a closed creation-date range.
    pub fn range(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            created_to: Some(to),
            ..Self::default()
        }
    }

    /// Same filter, continued at `token`.
    pub fn next_page(&self, token: String) -> Self {
        Self {
            page_token: Some(token),
            ..self.clone()
        }
    }
}

/// One page of raw orders.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub records: Vec<RawRecord>,
    /// Continuation token; `None` once the stream is exhausted.
    pub next_page: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

/// A sale event normalized from any source.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrder {
    pub source: Source,
    pub external_id: String,
    pub order_date: DateTime<Utc>,
    /// Last-modified time at the source; the order's stream position.
    pub updated_at: DateTime<Utc>,
    pub counterparty: Option<String>,
    pub status: String,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
    pub line_items: Vec<LineItem>,
    /// False when the source needs a second call for line items and it has
    /// not been made yet.
    pub line_items_loaded: bool,
}

impl NormalizedOrder {
    /// Stream position of this order for cursor bookkeeping.
    pub fn position(&self) -> CursorPosition {
        CursorPosition::with_token(self.updated_at, self.external_id.clone())
    }
}

/// A source's current price snapshot for one catalog id.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    /// The id the snapshot belongs to (as requested in `fetch_batch`).
    pub external_id: String,
    pub price: Option<Decimal>,
    pub currency: String,
    pub offer_count: Option<i32>,
    /// Sales rank or listing count, depending on the source.
    pub secondary_metric: Option<i64>,
    pub observed_at: DateTime<Utc>,
}

/// One competing listing seen on a comparison source.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedListing {
    pub external_id: String,
    pub title: Option<String>,
    pub price: Decimal,
    /// Shipping and fees on top of `price`.
    pub shipping: Decimal,
    pub currency: String,
    pub condition: Option<String>,
    pub is_active: bool,
}

impl ObservedListing {
    /// Landed cost used by every margin computation.
    pub fn total(&self) -> Decimal {
        self.price + self.shipping
    }
}

/// How a source delivers order line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemMode {
    /// Line items come back with the order summary.
    Inline,
    /// One extra billable call per order.
    SecondCall,
}

/// Which job types a source can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub orders: bool,
    pub line_items: LineItemMode,
    pub prices: bool,
    pub listings: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        orders: false,
        line_items: LineItemMode::Inline,
        prices: false,
        listings: false,
    };
}

/// Per-source translation layer between a marketplace and the engine.
///
/// One implementation per source. Billable calls (`list_orders`,
/// `fetch_line_items`, `fetch_batch`, `search_listings`) return the source's
/// remaining budget so a [`RateLimitedClient`](super::RateLimitedClient)
/// wrapper can keep its token bucket honest. Normalization is pure and never
/// touches the network.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The source this adapter talks to.
    fn source(&self) -> Source;

    /// What this source supports.
    fn capabilities(&self) -> Capabilities;

    /// Maximum number of ids per `fetch_batch` call.
    fn max_batch_size(&self) -> usize {
        1
    }

    /// Translate a stored cursor into this source's incremental query.
    fn build_incremental_filter(&self, cursor: Option<&CursorPosition>) -> OrderFilter {
        OrderFilter {
            updated_since: cursor.map(|c| c.at),
            ..OrderFilter::default()
        }
    }

    /// Fetch one page of raw orders.
    async fn list_orders(
        &self,
        _filter: &OrderFilter,
        _page_limit: u32,
    ) -> Result<Fetched<OrderPage>> {
        Err(PlatformError::unsupported(self.source().as_str(), "order sync"))
    }

    /// Map one raw order to the normalized shape.
    fn normalize_order(&self, _raw: &RawRecord) -> Result<NormalizedOrder> {
        Err(PlatformError::unsupported(self.source().as_str(), "order sync"))
    }

    /// Load line items for one order. Sources with inline items return what
    /// the order already carries without a network call.
    async fn fetch_line_items(&self, order: &NormalizedOrder) -> Result<Fetched<Vec<LineItem>>> {
        Ok(Fetched::new(order.line_items.clone()))
    }

    /// Fetch price records for up to `max_batch_size()` ids. Ids the source
    /// cannot resolve are simply absent from the result.
    async fn fetch_batch(&self, _ids: &[String]) -> Result<Fetched<Vec<RawRecord>>> {
        Err(PlatformError::unsupported(self.source().as_str(), "price sync"))
    }

    /// Map one raw price record to a snapshot.
    fn normalize_price(&self, _raw: &RawRecord) -> Result<PriceSnapshot> {
        Err(PlatformError::unsupported(self.source().as_str(), "price sync"))
    }

    /// Search competing listings for a comparison id.
    async fn search_listings(&self, _query: &str) -> Result<Fetched<Vec<RawRecord>>> {
        Err(PlatformError::unsupported(
            self.source().as_str(),
            "comparison listings",
        ))
    }

    /// Map one raw listing to an observed listing.
    fn normalize_listing(&self, _raw: &RawRecord) -> Result<ObservedListing> {
        Err(PlatformError::unsupported(
            self.source().as_str(),
            "comparison listings",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn cursor_positions_order_by_time_then_token() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let a = CursorPosition::with_token(t, "A-100");
        let b = CursorPosition::with_token(t, "A-101");
        let later = CursorPosition::at(t + chrono::Duration::seconds(1));

        assert!(a < b);
        assert!(b < later);
        assert!(CursorPosition::at(t) < a);
    }

    #[test]
    fn observed_listing_total_is_landed_cost() {
        let listing = ObservedListing {
            external_id: "123".to_string(),
            title: None,
            price: dec!(10.00),
            shipping: dec!(2.50),
            currency: "GBP".to_string(),
            condition: None,
            is_active: true,
        };
        assert_eq!(listing.total(), dec!(12.50));
    }

    #[test]
    fn order_filter_next_page_keeps_bounds() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let filter = OrderFilter::range(from, to).next_page("tok".to_string());
        assert_eq!(filter.created_from, Some(from));
        assert_eq!(filter.created_to, Some(to));
        assert_eq!(filter.page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn line_item_serializes_without_empty_optionals() {
        let item = LineItem {
            sku: "SYNC-75192".to_string(),
            title: None,
            quantity: 1,
            unit_price: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"sku": "SYNC-75192", "quantity": 1}));
    }
}

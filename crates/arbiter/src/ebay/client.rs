//! eBay REST API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::convert::{to_normalized_order, to_observed_listing};
use super::error::EbayError;
use super::types::{ItemSearchPage, OrderSearchPage};
use crate::entity::source::Source;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport, build_url, check_status};
use crate::platform::{
    Capabilities, Fetched, LineItemMode, NormalizedOrder, ObservedListing, OrderFilter, OrderPage,
    PlatformError, RawRecord, Result, SourceAdapter,
};

/// Production REST host.
pub const EBAY_API_URL: &str = "https://api.ebay.com";

/// Marketplace header value for ebay.co.uk.
pub const EBAY_GB: &str = "EBAY_GB";

/// Largest page `getOrders` serves.
const MAX_ORDER_PAGE: u32 = 200;
/// Search rows fetched per comparison lookup.
const SEARCH_LIMIT: u32 = 50;

fn ebay_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// eBay Sell Fulfillment and Browse API client.
#[derive(Clone)]
pub struct EbayAdapter {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: String,
    marketplace: String,
}

impl EbayAdapter {
    pub fn new(token: &str, marketplace: &str) -> std::result::Result<Self, EbayError> {
        if token.trim().is_empty() {
            return Err(EbayError::MissingToken);
        }
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))
            .map_err(|e| EbayError::Http(e.to_string()))?;

        Ok(Self::new_with_transport(
            EBAY_API_URL,
            token,
            marketplace,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        base_url: &str,
        token: &str,
        marketplace: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            marketplace: marketplace.to_string(),
        }
    }

    /// Point the client at another host (sandbox, proxy).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `filter` expression for `getOrders`.
    fn order_filter(filter: &OrderFilter) -> Option<String> {
        if let Some(since) = filter.updated_since {
            return Some(format!("lastmodifieddate:[{}..]", ebay_time(since)));
        }
        match (filter.created_from, filter.created_to) {
            (Some(from), Some(to)) => Some(format!(
                "creationdate:[{}..{}]",
                ebay_time(from),
                ebay_time(to)
            )),
            (Some(from), None) => Some(format!("creationdate:[{}..]", ebay_time(from))),
            (None, Some(to)) => Some(format!("creationdate:[..{}]", ebay_time(to))),
            (None, None) => None,
        }
    }

    /// Query for one `getOrders` page. The page token is a plain offset.
    fn orders_query(filter: &OrderFilter, page_limit: u32) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(expr) = Self::order_filter(filter) {
            query.push(("filter", expr));
        }
        query.push(("limit", page_limit.clamp(1, MAX_ORDER_PAGE).to_string()));
        query.push((
            "offset",
            filter.page_token.clone().unwrap_or_else(|| "0".to_string()),
        ));
        query
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let url = build_url(&self.base_url, path, query)?;
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("X-EBAY-C-MARKETPLACE-ID", &self.marketplace)
            .bearer(&self.token);

        let resp = check_status(self.transport.send(request).await?, resource)?;
        resp.json()
    }
}

#[async_trait]
impl SourceAdapter for EbayAdapter {
    fn source(&self) -> Source {
        Source::Ebay
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            orders: true,
            line_items: LineItemMode::Inline,
            prices: false,
            listings: true,
        }
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page_limit: u32,
    ) -> Result<Fetched<OrderPage>> {
        let query = Self::orders_query(filter, page_limit);
        let page: OrderSearchPage = self
            .get("sell/fulfillment/v1/order", &query, "orders")
            .await?;

        let consumed = page.offset + page.orders.len() as u64;
        let next_page = (!page.orders.is_empty() && consumed < page.total)
            .then(|| consumed.to_string());

        Ok(Fetched::new(OrderPage {
            records: page.orders,
            next_page,
        }))
    }

    fn normalize_order(&self, raw: &RawRecord) -> Result<NormalizedOrder> {
        to_normalized_order(raw)
    }

    async fn search_listings(&self, query: &str) -> Result<Fetched<Vec<RawRecord>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlatformError::internal("empty search query"));
        }
        let page: ItemSearchPage = self
            .get(
                "buy/browse/v1/item_summary/search",
                &[("q", query.to_string()), ("limit", SEARCH_LIMIT.to_string())],
                &format!("search {query}"),
            )
            .await?;
        Ok(Fetched::new(page.item_summaries))
    }

    fn normalize_listing(&self, raw: &RawRecord) -> Result<ObservedListing> {
        to_observed_listing(raw, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, header_get};
    use chrono::TimeZone;
    use serde_json::json;

    const BASE: &str = "https://ebay.test";

    fn adapter(transport: &MockTransport) -> EbayAdapter {
        EbayAdapter::new_with_transport(BASE, "v^1.1#token", EBAY_GB, Arc::new(transport.clone()))
    }

    fn order_json(id: &str) -> serde_json::Value {
        json!({"orderId": id, "creationDate": "2025-03-01T10:00:00Z"})
    }

    #[test]
    fn incremental_filter_uses_last_modified() {
        let since = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let filter = OrderFilter {
            updated_since: Some(since),
            ..OrderFilter::default()
        };
        assert_eq!(
            EbayAdapter::order_filter(&filter).as_deref(),
            Some("lastmodifieddate:[2025-03-01T12:00:00.000Z..]")
        );
    }

    #[test]
    fn range_filter_uses_creation_date() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            EbayAdapter::order_filter(&OrderFilter::range(from, to)).as_deref(),
            Some("creationdate:[2024-01-01T00:00:00.000Z..2024-02-01T00:00:00.000Z]")
        );
        assert_eq!(EbayAdapter::order_filter(&OrderFilter::default()), None);
    }

    #[tokio::test]
    async fn list_orders_pages_by_offset() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let first = OrderFilter::default();
        let second = first.next_page("2".to_string());

        transport.push_json(
            HttpMethod::Get,
            build_url(
                BASE,
                "sell/fulfillment/v1/order",
                &EbayAdapter::orders_query(&first, 2),
            )
            .unwrap(),
            json!({"orders": [order_json("1"), order_json("2")], "total": 3, "offset": 0}),
        );
        transport.push_json(
            HttpMethod::Get,
            build_url(
                BASE,
                "sell/fulfillment/v1/order",
                &EbayAdapter::orders_query(&second, 2),
            )
            .unwrap(),
            json!({"orders": [order_json("3")], "total": 3, "offset": 2}),
        );

        let page = adapter.list_orders(&first, 2).await.unwrap().data;
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next_page.as_deref(), Some("2"));

        let page = adapter.list_orders(&second, 2).await.unwrap().data;
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next_page, None);

        let sent = transport.requests();
        assert_eq!(
            header_get(&sent[0].headers, "authorization"),
            Some("Bearer v^1.1#token")
        );
        assert_eq!(
            header_get(&sent[0].headers, "x-ebay-c-marketplace-id"),
            Some("EBAY_GB")
        );
    }

    #[tokio::test]
    async fn search_listings_returns_rows() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            build_url(
                BASE,
                "buy/browse/v1/item_summary/search",
                &[("q", "75192".to_string()), ("limit", "50".to_string())],
            )
            .unwrap(),
            json!({"itemSummaries": [
                {"itemId": "v1|1|0", "price": {"value": "600.00", "currency": "GBP"}}
            ]}),
        );

        let adapter = adapter(&transport);
        let rows = adapter.search_listings(" 75192 ").await.unwrap().data;
        assert_eq!(rows.len(), 1);
        let listing = adapter.normalize_listing(&rows[0]).unwrap();
        assert_eq!(listing.external_id, "v1|1|0");
    }

    #[tokio::test]
    async fn search_listings_rejects_empty_query() {
        let err = adapter(&MockTransport::new())
            .search_listings("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Internal { .. }));
    }
}

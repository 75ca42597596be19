//! Amazon Orders API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::convert::{to_line_items, to_normalized_order};
use super::error::AmazonError;
use super::types::{Envelope, OrderItemsPayload, OrdersPayload};
use crate::entity::source::Source;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport, build_url, check_status};
use crate::platform::{
    Capabilities, Fetched, LineItem, LineItemMode, NormalizedOrder, OrderFilter, OrderPage,
    PlatformError, RawRecord, Result, SourceAdapter,
};

/// Selling Partner API endpoint for the EU region.
pub const AMAZON_EU_URL: &str = "https://sellingpartnerapi-eu.amazon.com";

/// Marketplace id of amazon.co.uk.
pub const UK_MARKETPLACE_ID: &str = "A1F83G8C2ARO7P";

/// Lower bound for an unbounded (full) order fetch; the API requires one.
const EARLIEST_ORDER_DATE: &str = "2015-01-01T00:00:00Z";

/// Largest page `getOrders` serves.
const MAX_PAGE_SIZE: u32 = 100;

/// Item pages followed for one order before giving up.
const MAX_ITEM_PAGES: usize = 20;

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Amazon Selling Partner API client.
#[derive(Clone)]
pub struct AmazonAdapter {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    access_token: String,
    marketplace_id: String,
}

impl AmazonAdapter {
    pub fn new(
        access_token: &str,
        marketplace_id: &str,
    ) -> std::result::Result<Self, AmazonError> {
        if access_token.trim().is_empty() {
            return Err(AmazonError::MissingToken);
        }
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))
            .map_err(|e| AmazonError::Http(e.to_string()))?;

        Ok(Self::new_with_transport(
            AMAZON_EU_URL,
            access_token,
            marketplace_id,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        base_url: &str,
        access_token: &str,
        marketplace_id: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.trim().to_string(),
            marketplace_id: marketplace_id.to_string(),
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

    /// Query parameters for one `getOrders` page.
    ///
    /// A continuation token replaces every other filter, as the API demands.
    fn orders_query(&self, filter: &OrderFilter, page_limit: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![("MarketplaceIds", self.marketplace_id.clone())];
        if let Some(token) = &filter.page_token {
            query.push(("NextToken", token.clone()));
            return query;
        }

        match (filter.updated_since, filter.created_from) {
            (Some(since), _) => query.push(("LastUpdatedAfter", iso(since))),
            (None, Some(from)) => query.push(("CreatedAfter", iso(from))),
            (None, None) => query.push(("CreatedAfter", EARLIEST_ORDER_DATE.to_string())),
        }
        if let Some(to) = filter.created_to {
            query.push(("CreatedBefore", iso(to)));
        }
        query.push((
            "MaxResultsPerPage",
            page_limit.clamp(1, MAX_PAGE_SIZE).to_string(),
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
            .header("x-amz-access-token", &self.access_token);

        let resp = check_status(self.transport.send(request).await?, resource)?;
        let envelope: Envelope<T> = resp.json()?;

        if let Some(err) = envelope.errors.first() {
            return Err(PlatformError::api(
                resp.status,
                format!("{}: {}", err.code, err.message),
            ));
        }
        envelope
            .payload
            .ok_or_else(|| PlatformError::api(resp.status, "response has no payload"))
    }
}

#[async_trait]
impl SourceAdapter for AmazonAdapter {
    fn source(&self) -> Source {
        Source::Amazon
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            orders: true,
            line_items: LineItemMode::SecondCall,
            prices: false,
            listings: false,
        }
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page_limit: u32,
    ) -> Result<Fetched<OrderPage>> {
        let query = self.orders_query(filter, page_limit);
        let payload: OrdersPayload = self.get("orders/v0/orders", &query, "orders").await?;

        Ok(Fetched::new(OrderPage {
            records: payload.orders,
            next_page: payload.next_token.filter(|t| !t.is_empty()),
        }))
    }

    fn normalize_order(&self, raw: &RawRecord) -> Result<NormalizedOrder> {
        to_normalized_order(raw)
    }

    async fn fetch_line_items(&self, order: &NormalizedOrder) -> Result<Fetched<Vec<LineItem>>> {
        let path = format!("orders/v0/orders/{}/orderItems", order.external_id);
        let resource = format!("order {}", order.external_id);

        let mut items = Vec::new();
        let mut query = Vec::new();
        for _ in 0..MAX_ITEM_PAGES {
            let payload: OrderItemsPayload = self.get(&path, &query, &resource).await?;
            items.extend(to_line_items(&payload.order_items));

            match payload.next_token.filter(|t| !t.is_empty()) {
                Some(token) => query = vec![("NextToken", token)],
                None => return Ok(Fetched::new(items)),
            }
        }

        Err(AmazonError::TooManyItemPages {
            order: order.external_id.clone(),
            pages: MAX_ITEM_PAGES,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, json_response};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const BASE: &str = "https://sp.test";

    fn adapter(transport: &MockTransport) -> AmazonAdapter {
        AmazonAdapter::new_with_transport(
            BASE,
            "Atza|token",
            UK_MARKETPLACE_ID,
            Arc::new(transport.clone()),
        )
    }

    fn orders_url(query: &[(&str, String)]) -> String {
        build_url(BASE, "orders/v0/orders", query).unwrap()
    }

    #[test]
    fn incremental_query_uses_last_updated_after() {
        let since = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let filter = OrderFilter {
            updated_since: Some(since),
            ..OrderFilter::default()
        };
        let query = adapter(&MockTransport::new()).orders_query(&filter, 50);
        assert_eq!(
            query,
            vec![
                ("MarketplaceIds", UK_MARKETPLACE_ID.to_string()),
                ("LastUpdatedAfter", "2025-03-01T12:00:00Z".to_string()),
                ("MaxResultsPerPage", "50".to_string()),
            ]
        );
    }

    #[test]
    fn range_query_bounds_creation_date() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let query =
            adapter(&MockTransport::new()).orders_query(&OrderFilter::range(from, to), 500);
        assert!(query.contains(&("CreatedAfter", "2024-01-01T00:00:00Z".to_string())));
        assert!(query.contains(&("CreatedBefore", "2024-02-01T00:00:00Z".to_string())));
        assert!(query.contains(&("MaxResultsPerPage", "100".to_string())));
    }

    #[test]
    fn unbounded_query_starts_at_earliest_date() {
        let query = adapter(&MockTransport::new()).orders_query(&OrderFilter::default(), 10);
        assert!(query.contains(&("CreatedAfter", EARLIEST_ORDER_DATE.to_string())));
    }

    #[test]
    fn next_token_replaces_filters() {
        let filter = OrderFilter::default().next_page("tok==".to_string());
        let query = adapter(&MockTransport::new()).orders_query(&filter, 10);
        assert_eq!(
            query,
            vec![
                ("MarketplaceIds", UK_MARKETPLACE_ID.to_string()),
                ("NextToken", "tok==".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn list_orders_returns_page_and_token() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let filter = OrderFilter::default();
        transport.push_json(
            HttpMethod::Get,
            orders_url(&adapter.orders_query(&filter, 100)),
            json!({
                "payload": {
                    "Orders": [
                        {"AmazonOrderId": "A-100", "PurchaseDate": "2025-03-01T10:00:00Z"}
                    ],
                    "NextToken": "page-2",
                }
            }),
        );

        let page = adapter.list_orders(&filter, 100).await.unwrap().data;
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next_page.as_deref(), Some("page-2"));

        let sent = transport.requests();
        assert_eq!(
            crate::http::header_get(&sent[0].headers, "x-amz-access-token"),
            Some("Atza|token")
        );
    }

    #[tokio::test]
    async fn list_orders_surfaces_envelope_errors() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let filter = OrderFilter::default();
        transport.push_json(
            HttpMethod::Get,
            orders_url(&adapter.orders_query(&filter, 100)),
            json!({"errors": [{"code": "InvalidInput", "message": "bad date"}]}),
        );

        let err = adapter.list_orders(&filter, 100).await.unwrap_err();
        assert!(err.to_string().contains("InvalidInput"));
    }

    #[tokio::test]
    async fn throttled_orders_call_reports_retry_after() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let filter = OrderFilter::default();
        let mut resp = json_response(429, json!({"errors": []}));
        resp.headers.push(("Retry-After".to_string(), "5".to_string()));
        transport.push_response(
            HttpMethod::Get,
            orders_url(&adapter.orders_query(&filter, 100)),
            resp,
        );

        let err = adapter.list_orders(&filter, 100).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(5)
        ));
    }

    #[tokio::test]
    async fn fetch_line_items_calls_order_items() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        transport.push_json(
            HttpMethod::Get,
            build_url(BASE, "orders/v0/orders/A-100/orderItems", &[]).unwrap(),
            json!({
                "payload": {
                    "OrderItems": [{
                        "SellerSKU": "SYNC-75192",
                        "QuantityOrdered": 1,
                        "ItemPrice": {"CurrencyCode": "GBP", "Amount": "649.99"}
                    }]
                }
            }),
        );

        let order = adapter
            .normalize_order(&json!({
                "AmazonOrderId": "A-100",
                "PurchaseDate": "2025-03-01T10:00:00Z"
            }))
            .unwrap();
        let items = adapter.fetch_line_items(&order).await.unwrap().data;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "SYNC-75192");
        assert_eq!(items[0].unit_price, Some(dec!(649.99)));
    }

    #[tokio::test]
    async fn fetch_line_items_follows_next_token() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let path = "orders/v0/orders/A-200/orderItems";
        transport.push_json(
            HttpMethod::Get,
            build_url(BASE, path, &[]).unwrap(),
            json!({
                "payload": {
                    "OrderItems": [{"SellerSKU": "SYNC-10179", "QuantityOrdered": 1}],
                    "NextToken": "items-2"
                }
            }),
        );
        transport.push_json(
            HttpMethod::Get,
            build_url(BASE, path, &[("NextToken", "items-2".to_string())]).unwrap(),
            json!({
                "payload": {
                    "OrderItems": [{"SellerSKU": "SYNC-75192", "QuantityOrdered": 2}]
                }
            }),
        );

        let order = adapter
            .normalize_order(&json!({
                "AmazonOrderId": "A-200",
                "PurchaseDate": "2025-03-01T10:00:00Z"
            }))
            .unwrap();
        let items = adapter.fetch_line_items(&order).await.unwrap().data;
        let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["SYNC-10179", "SYNC-75192"]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn endless_item_pages_are_an_error() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        let path = "orders/v0/orders/A-300/orderItems";
        let page = json!({
            "payload": {
                "OrderItems": [{"SellerSKU": "SYNC-1", "QuantityOrdered": 1}],
                "NextToken": "again"
            }
        });
        transport.push_json(HttpMethod::Get, build_url(BASE, path, &[]).unwrap(), page.clone());
        for _ in 1..MAX_ITEM_PAGES {
            transport.push_json(
                HttpMethod::Get,
                build_url(BASE, path, &[("NextToken", "again".to_string())]).unwrap(),
                page.clone(),
            );
        }

        let order = adapter
            .normalize_order(&json!({
                "AmazonOrderId": "A-300",
                "PurchaseDate": "2025-03-01T10:00:00Z"
            }))
            .unwrap();
        let err = adapter.fetch_line_items(&order).await.unwrap_err();
        assert!(err.to_string().contains("A-300"));
        assert_eq!(transport.requests().len(), MAX_ITEM_PAGES);
    }

    #[tokio::test]
    async fn missing_order_maps_to_not_found() {
        let transport = MockTransport::new();
        let adapter = adapter(&transport);
        transport.push_response(
            HttpMethod::Get,
            build_url(BASE, "orders/v0/orders/A-404/orderItems", &[]).unwrap(),
            json_response(404, json!({})),
        );

        let order = adapter
            .normalize_order(&json!({
                "AmazonOrderId": "A-404",
                "PurchaseDate": "2025-03-01T10:00:00Z"
            }))
            .unwrap();
        let err = adapter.fetch_line_items(&order).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { .. }));
    }
}

//! BrickLink store API client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::convert::{listing_id, to_line_items, to_normalized_order, to_observed_listing};
use super::error::BrickLinkError;
use super::oauth::OAuthCredentials;
use super::types::{BrickLinkOrderItem, Envelope, PriceGuide};
use crate::entity::source::Source;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpTransport, build_url, check_status};
use crate::platform::{
    Capabilities, Fetched, LineItem, LineItemMode, NormalizedOrder, ObservedListing, OrderFilter,
    OrderPage, PlatformError, RawRecord, Result, SourceAdapter,
};

/// Store API root.
pub const BRICKLINK_API_URL: &str = "https://api.bricklink.com/api/store/v1";

/// Price guide rows are limited to sellers in this country.
const GUIDE_COUNTRY: &str = "UK";
const GUIDE_CURRENCY: &str = "GBP";

/// BrickLink store API client.
#[derive(Clone)]
pub struct BrickLinkAdapter {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credentials: OAuthCredentials,
}

impl BrickLinkAdapter {
    pub fn new(credentials: OAuthCredentials) -> std::result::Result<Self, BrickLinkError> {
        if !credentials.is_complete() {
            return Err(BrickLinkError::MissingCredentials);
        }
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))
            .map_err(|e| BrickLinkError::Http(e.to_string()))?;

        Ok(Self::new_with_transport(
            BRICKLINK_API_URL,
            credentials,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        base_url: &str,
        credentials: OAuthCredentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
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

    /// Catalog number with the variant suffix the API requires.
    fn set_number(query: &str) -> String {
        if query.contains('-') {
            query.to_string()
        } else {
            format!("{query}-1")
        }
    }

    fn price_guide_query() -> Vec<(&'static str, String)> {
        vec![
            ("guide_type", "stock".to_string()),
            ("new_or_used", "N".to_string()),
            ("country_code", GUIDE_COUNTRY.to_string()),
            ("currency_code", GUIDE_CURRENCY.to_string()),
        ]
    }

    /// Whether an order summary falls inside `filter`. The orders endpoint
    /// has no date parameters, so the window is applied here.
    fn in_window(filter: &OrderFilter, raw: &RawRecord) -> bool {
        let Ok(order) = to_normalized_order(raw) else {
            // Let normalization report it.
            return true;
        };
        filter.updated_since.is_none_or(|since| order.updated_at >= since)
            && filter.created_from.is_none_or(|from| order.order_date >= from)
            && filter.created_to.is_none_or(|to| order.order_date <= to)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let url = build_url(&self.base_url, path, query)?;
        let nonce = Uuid::new_v4().simple().to_string();
        let auth = self.credentials.authorization_header(
            HttpMethod::Get,
            &url,
            &nonce,
            Utc::now().timestamp(),
        )?;
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("Authorization", auth);

        let resp = check_status(self.transport.send(request).await?, resource)?;
        let envelope: Envelope<T> = resp.json()?;
        let meta = envelope.meta;
        match meta.code {
            200..=299 => envelope
                .data
                .ok_or_else(|| PlatformError::api(meta.code, "response has no data")),
            401 | 403 => Err(PlatformError::AuthRequired),
            404 => Err(PlatformError::not_found(resource)),
            429 => Err(PlatformError::RateLimited { retry_after: None }),
            code => Err(PlatformError::api(
                code,
                format!("{}: {}", meta.message, meta.description),
            )),
        }
    }
}

#[async_trait]
impl SourceAdapter for BrickLinkAdapter {
    fn source(&self) -> Source {
        Source::BrickLink
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            orders: true,
            line_items: LineItemMode::SecondCall,
            prices: false,
            listings: true,
        }
    }

    /// Received orders. BrickLink returns them in a single response, so
    /// there is never a next page.
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        _page_limit: u32,
    ) -> Result<Fetched<OrderPage>> {
        let orders: Vec<RawRecord> = self
            .get("orders", &[("direction", "in".to_string())], "orders")
            .await?;

        let records: Vec<RawRecord> = orders
            .into_iter()
            .filter(|raw| Self::in_window(filter, raw))
            .collect();

        Ok(Fetched::new(OrderPage {
            records,
            next_page: None,
        }))
    }

    fn normalize_order(&self, raw: &RawRecord) -> Result<NormalizedOrder> {
        to_normalized_order(raw)
    }

    async fn fetch_line_items(&self, order: &NormalizedOrder) -> Result<Fetched<Vec<LineItem>>> {
        // Lots come back grouped into shipping batches.
        let batches: Vec<Vec<BrickLinkOrderItem>> = self
            .get(
                &format!("orders/{}/items", order.external_id),
                &[],
                &format!("order {}", order.external_id),
            )
            .await?;
        let lots: Vec<BrickLinkOrderItem> = batches.into_iter().flatten().collect();
        Ok(Fetched::new(to_line_items(&lots)))
    }

    async fn search_listings(&self, query: &str) -> Result<Fetched<Vec<RawRecord>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlatformError::internal("empty search query"));
        }
        let no = Self::set_number(query);
        let guide: PriceGuide = self
            .get(
                &format!("items/SET/{no}/price"),
                &Self::price_guide_query(),
                &format!("set {no}"),
            )
            .await?;

        let condition = guide.new_or_used.clone().unwrap_or_else(|| "N".to_string());
        let currency = guide
            .currency_code
            .clone()
            .unwrap_or_else(|| GUIDE_CURRENCY.to_string());
        let mut seen: HashMap<String, u32> = HashMap::new();

        let rows = guide
            .price_detail
            .into_iter()
            .map(|mut row| {
                let unit_price = row
                    .get("unit_price")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let quantity = row.get("quantity").and_then(Value::as_i64).unwrap_or(0) as i32;
                let key = format!("{unit_price}-{quantity}");
                let count = seen.entry(key).or_insert(0);
                let id = listing_id(&no, &condition, &unit_price, quantity, *count);
                *count += 1;

                if let Some(obj) = row.as_object_mut() {
                    obj.insert("listing_id".to_string(), Value::String(id));
                    obj.entry("currency_code")
                        .or_insert_with(|| Value::String(currency.clone()));
                    obj.entry("new_or_used")
                        .or_insert_with(|| Value::String(condition.clone()));
                }
                row
            })
            .collect();
        Ok(Fetched::new(rows))
    }

    fn normalize_listing(&self, raw: &RawRecord) -> Result<ObservedListing> {
        to_observed_listing(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, header_get, json_response};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const BASE: &str = "https://bricklink.test/api/store/v1";

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            token: "tk".to_string(),
            token_secret: "ts".to_string(),
        }
    }

    fn adapter(transport: &MockTransport) -> BrickLinkAdapter {
        BrickLinkAdapter::new_with_transport(BASE, credentials(), Arc::new(transport.clone()))
    }

    fn orders_url() -> String {
        build_url(BASE, "orders", &[("direction", "in".to_string())]).unwrap()
    }

    fn ok(data: Value) -> Value {
        json!({"meta": {"code": 200, "message": "OK", "description": "OK"}, "data": data})
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let mut creds = credentials();
        creds.consumer_secret = String::new();
        assert!(matches!(
            BrickLinkAdapter::new(creds),
            Err(BrickLinkError::MissingCredentials)
        ));
    }

    #[test]
    fn set_number_gets_variant_suffix() {
        assert_eq!(BrickLinkAdapter::set_number("75192"), "75192-1");
        assert_eq!(BrickLinkAdapter::set_number("75192-2"), "75192-2");
    }

    #[tokio::test]
    async fn list_orders_filters_by_status_change() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            orders_url(),
            ok(json!([
                {"order_id": 1, "date_ordered": "2025-03-01T10:00:00Z",
                 "date_status_changed": "2025-03-01T10:00:00Z"},
                {"order_id": 2, "date_ordered": "2025-03-01T10:00:00Z",
                 "date_status_changed": "2025-03-05T10:00:00Z"}
            ])),
        );

        let filter = OrderFilter {
            updated_since: Some(Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()),
            ..OrderFilter::default()
        };
        let adapter = adapter(&transport);
        let page = adapter.list_orders(&filter, 100).await.unwrap().data;

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next_page, None);
        assert_eq!(adapter.normalize_order(&page.records[0]).unwrap().external_id, "2");

        let sent = transport.requests();
        let auth = header_get(&sent[0].headers, "authorization").unwrap();
        assert!(auth.starts_with("OAuth oauth_consumer_key=\"ck\""));
        assert!(auth.contains("oauth_signature="));
    }

    #[tokio::test]
    async fn meta_code_overrides_http_status() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            orders_url(),
            json!({"meta": {"code": 401, "message": "BAD_OAUTH_REQUEST", "description": "x"}}),
        );
        let err = adapter(&transport)
            .list_orders(&OrderFilter::default(), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::AuthRequired));
    }

    #[tokio::test]
    async fn http_throttle_is_rate_limited() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            orders_url(),
            json_response(429, json!({})),
        );
        let err = adapter(&transport)
            .list_orders(&OrderFilter::default(), 100)
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn line_items_flatten_batches() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            build_url(BASE, "orders/7/items", &[]).unwrap(),
            ok(json!([
                [{"item": {"no": "75192-1"}, "quantity": 1, "remarks": "SYNC-75192"}],
                [{"item": {"no": "10294-1"}, "quantity": 2}]
            ])),
        );

        let adapter = adapter(&transport);
        let order = to_normalized_order(&json!({
            "order_id": 7, "date_ordered": "2025-03-01T10:00:00Z"
        }))
        .unwrap();
        let items = adapter.fetch_line_items(&order).await.unwrap().data;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sku, "SYNC-75192");
        assert_eq!(items[1].sku, "10294-1");
    }

    #[tokio::test]
    async fn price_guide_rows_get_stable_ids() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            build_url(
                BASE,
                "items/SET/75192-1/price",
                &BrickLinkAdapter::price_guide_query(),
            )
            .unwrap(),
            ok(json!({
                "new_or_used": "N",
                "currency_code": "GBP",
                "price_detail": [
                    {"quantity": 1, "unit_price": "600.0000"},
                    {"quantity": 1, "unit_price": "600.0000"},
                    {"quantity": 3, "unit_price": "640.0000"}
                ]
            })),
        );

        let adapter = adapter(&transport);
        let rows = adapter.search_listings("75192").await.unwrap().data;
        let listings: Vec<ObservedListing> = rows
            .iter()
            .map(|r| adapter.normalize_listing(r).unwrap())
            .collect();

        assert_eq!(listings[0].external_id, "75192-1-N-600.0000-1");
        assert_eq!(listings[1].external_id, "75192-1-N-600.0000-1#1");
        assert_eq!(listings[2].external_id, "75192-1-N-640.0000-3");
        assert_eq!(listings[2].price, dec!(640));
        assert_eq!(listings[0].currency, "GBP");
    }

    #[test]
    fn capabilities_cover_orders_and_listings() {
        let caps = adapter(&MockTransport::new()).capabilities();
        assert!(caps.orders && caps.listings && !caps.prices);
        assert_eq!(caps.line_items, LineItemMode::SecondCall);
    }
}

//! BrickLink store API data types.
//!
//! API docs: https://www.bricklink.com/v3/api.page

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Every response is wrapped in `{meta, data}`. The HTTP status is usually
/// 200; the real outcome is `meta.code`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrickLinkCost {
    pub currency_code: Option<String>,
    pub grand_total: Option<String>,
}

/// One order summary from `GET /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrickLinkOrder {
    pub order_id: u64,
    pub date_ordered: DateTime<Utc>,
    pub date_status_changed: Option<DateTime<Utc>>,
    pub buyer_name: Option<String>,
    pub status: Option<String>,
    pub cost: Option<BrickLinkCost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRef {
    pub no: String,
    pub name: Option<String>,
}

/// One lot from `GET /orders/{id}/items`.
#[derive(Debug, Clone, Deserialize)]
pub struct BrickLinkOrderItem {
    pub item: CatalogRef,
    pub quantity: Option<i32>,
    /// Per-unit price after discounts.
    pub unit_price_final: Option<String>,
    /// Seller's private remarks; cross-listed lots carry their SKU here.
    pub remarks: Option<String>,
}

/// Body of a price guide request.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceGuide {
    pub currency_code: Option<String>,
    pub new_or_used: Option<String>,
    #[serde(default)]
    pub price_detail: Vec<serde_json::Value>,
}

/// One row of the price guide's current-stock detail.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceDetail {
    /// Assigned by the adapter; the price guide has no listing ids.
    pub listing_id: String,
    pub quantity: Option<i32>,
    pub unit_price: String,
    pub currency_code: Option<String>,
    pub new_or_used: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_without_data_still_parses() {
        let env: Envelope<Vec<serde_json::Value>> = serde_json::from_value(json!({
            "meta": {"code": 401, "message": "BAD_OAUTH_REQUEST", "description": "bad token"}
        }))
        .unwrap();
        assert_eq!(env.meta.code, 401);
        assert!(env.data.is_none());
    }

    #[test]
    fn order_item_reads_nested_catalog_ref() {
        let item: BrickLinkOrderItem = serde_json::from_value(json!({
            "item": {"no": "75192-1", "name": "Millennium Falcon", "type": "SET"},
            "quantity": 1,
            "unit_price_final": "649.9900",
            "remarks": "SYNC-75192"
        }))
        .unwrap();
        assert_eq!(item.item.no, "75192-1");
        assert_eq!(item.remarks.as_deref(), Some("SYNC-75192"));
    }
}

//! Amazon Orders API data types.
//!
//! API docs: https://developer-docs.amazon.com/sp-api/docs/orders-api-v0-reference

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response envelope shared by the Orders API operations.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub payload: Option<T>,
    #[serde(default)]
    pub errors: Vec<AmazonApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmazonApiError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Payload of `getOrders`. Orders stay raw until normalized.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrdersPayload {
    #[serde(default)]
    pub orders: Vec<serde_json::Value>,
    pub next_token: Option<String>,
}

/// Payload of `getOrderItems`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderItemsPayload {
    #[serde(default)]
    pub order_items: Vec<AmazonOrderItem>,
    pub next_token: Option<String>,
}

/// Money as sent by the API: a decimal string plus currency code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonMoney {
    pub currency_code: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuyerInfo {
    pub buyer_email: Option<String>,
}

/// One order summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonOrder {
    pub amazon_order_id: String,
    pub purchase_date: DateTime<Utc>,
    pub last_update_date: Option<DateTime<Utc>>,
    pub order_status: Option<String>,
    pub order_total: Option<AmazonMoney>,
    pub buyer_info: Option<BuyerInfo>,
}

/// One order line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonOrderItem {
    #[serde(rename = "SellerSKU")]
    pub seller_sku: Option<String>,
    pub title: Option<String>,
    pub quantity_ordered: Option<i32>,
    /// Price of the whole line (unit price times quantity).
    pub item_price: Option<AmazonMoney>,
}

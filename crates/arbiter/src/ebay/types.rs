//! eBay API data types.
//!
//! Fulfillment API: https://developer.ebay.com/api-docs/sell/fulfillment/resources/order/methods/getOrders
//! Browse API: https://developer.ebay.com/api-docs/buy/browse/resources/item_summary/methods/search

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Money as sent by eBay: a decimal string and an ISO currency code.
#[derive(Debug, Clone, Deserialize)]
pub struct EbayMoney {
    pub value: String,
    pub currency: Option<String>,
}

/// Body of `getOrders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSearchPage {
    #[serde(default)]
    pub orders: Vec<serde_json::Value>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EbayBuyer {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayPricingSummary {
    pub total: Option<EbayMoney>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayLineItem {
    pub sku: Option<String>,
    pub title: Option<String>,
    pub quantity: Option<i32>,
    /// Cost of the whole line before shipping.
    pub line_item_cost: Option<EbayMoney>,
}

/// One order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayOrder {
    pub order_id: String,
    pub creation_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub order_fulfillment_status: Option<String>,
    pub buyer: Option<EbayBuyer>,
    pub pricing_summary: Option<EbayPricingSummary>,
    #[serde(default)]
    pub line_items: Vec<EbayLineItem>,
}

/// Body of a Browse search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSearchPage {
    #[serde(default)]
    pub item_summaries: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayShippingOption {
    pub shipping_cost: Option<EbayMoney>,
}

/// One search result row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbayItemSummary {
    pub item_id: String,
    /// Numeric listing id shown on the site; exclusions use it when present.
    pub legacy_item_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<EbayMoney>,
    #[serde(default)]
    pub shipping_options: Vec<EbayShippingOption>,
    pub condition: Option<String>,
    pub item_end_date: Option<DateTime<Utc>>,
}

//! Conversion of eBay orders and search rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{EbayItemSummary, EbayLineItem, EbayMoney, EbayOrder};
use crate::entity::source::Source;
use crate::money::parse_amount;
use crate::platform::{
    LineItem, NormalizedOrder, ObservedListing, PlatformError, RawRecord, Result,
};

const UNKNOWN_STATUS: &str = "Unknown";
const DEFAULT_CURRENCY: &str = "GBP";

fn amount(money: Option<&EbayMoney>) -> Option<Decimal> {
    money.and_then(|m| parse_amount(&m.value))
}

fn record_id(raw: &RawRecord, field: &str) -> String {
    raw.get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>")
        .to_string()
}

fn to_line_item(item: &EbayLineItem) -> LineItem {
    let quantity = item.quantity.unwrap_or(0);
    let unit_price = match amount(item.line_item_cost.as_ref()) {
        Some(cost) if quantity > 1 => Some(cost / Decimal::from(quantity)),
        other => other,
    };
    LineItem {
        sku: item.sku.clone().unwrap_or_default(),
        title: item.title.clone(),
        quantity,
        unit_price,
    }
}

/// Map one `getOrders` entry. Line items are inline, so the result is
/// complete.
pub fn to_normalized_order(raw: &RawRecord) -> Result<NormalizedOrder> {
    let order: EbayOrder = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record_id(raw, "orderId"), e.to_string()))?;

    let total = order.pricing_summary.as_ref().and_then(|p| p.total.as_ref());
    Ok(NormalizedOrder {
        source: Source::Ebay,
        external_id: order.order_id.clone(),
        order_date: order.creation_date,
        updated_at: order.last_modified_date.unwrap_or(order.creation_date),
        counterparty: order.buyer.as_ref().and_then(|b| b.username.clone()),
        status: order
            .order_fulfillment_status
            .clone()
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        total: amount(total),
        currency: total.and_then(|m| m.currency.clone()),
        line_items: order.line_items.iter().map(to_line_item).collect(),
        line_items_loaded: true,
    })
}

/// Map one search row to a listing priced at landed cost.
///
/// A listing whose end date is at or before `as_of` is marked inactive.
pub fn to_observed_listing(raw: &RawRecord, as_of: DateTime<Utc>) -> Result<ObservedListing> {
    let item: EbayItemSummary = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record_id(raw, "itemId"), e.to_string()))?;

    let price = amount(item.price.as_ref())
        .ok_or_else(|| PlatformError::normalization(&item.item_id, "listing has no price"))?;
    let shipping = amount(
        item.shipping_options
            .first()
            .and_then(|o| o.shipping_cost.as_ref()),
    )
    .unwrap_or(Decimal::ZERO);

    Ok(ObservedListing {
        external_id: item.legacy_item_id.unwrap_or(item.item_id),
        title: item.title,
        price,
        shipping,
        currency: item
            .price
            .and_then(|p| p.currency)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        condition: item.condition,
        is_active: item.item_end_date.is_none_or(|end| end > as_of),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn order_carries_inline_line_items() {
        let raw = json!({
            "orderId": "12-34567-89012",
            "creationDate": "2025-03-01T10:00:00.000Z",
            "lastModifiedDate": "2025-03-01T11:00:00.000Z",
            "orderFulfillmentStatus": "NOT_STARTED",
            "buyer": {"username": "brickfan"},
            "pricingSummary": {"total": {"value": "54.98", "currency": "GBP"}},
            "lineItems": [
                {
                    "sku": "SYNC-10294",
                    "title": "Titanic",
                    "quantity": 2,
                    "lineItemCost": {"value": "50.00", "currency": "GBP"}
                }
            ],
        });

        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.source, Source::Ebay);
        assert_eq!(order.status, "NOT_STARTED");
        assert_eq!(order.counterparty.as_deref(), Some("brickfan"));
        assert_eq!(order.total, Some(dec!(54.98)));
        assert!(order.line_items_loaded);
        assert_eq!(order.line_items[0].sku, "SYNC-10294");
        assert_eq!(order.line_items[0].unit_price, Some(dec!(25)));
    }

    #[test]
    fn order_defaults_missing_status() {
        let raw = json!({
            "orderId": "12-00000-00001",
            "creationDate": "2025-03-01T10:00:00Z",
        });
        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.status, "Unknown");
        assert!(order.line_items.is_empty());
    }

    #[test]
    fn listing_total_includes_first_shipping_option() {
        let raw = json!({
            "itemId": "v1|394820193|0",
            "legacyItemId": "394820193",
            "title": "LEGO 75192 sealed",
            "price": {"value": "10.00", "currency": "GBP"},
            "shippingOptions": [
                {"shippingCost": {"value": "3.49", "currency": "GBP"}},
                {"shippingCost": {"value": "9.99", "currency": "GBP"}}
            ],
            "condition": "New",
        });
        let listing = to_observed_listing(&raw, Utc::now()).unwrap();
        assert_eq!(listing.external_id, "394820193");
        assert_eq!(listing.total(), dec!(13.49));
        assert!(listing.is_active);
    }

    #[test]
    fn listing_without_shipping_or_legacy_id() {
        let raw = json!({
            "itemId": "v1|111|0",
            "price": {"value": "12.00"},
        });
        let listing = to_observed_listing(&raw, Utc::now()).unwrap();
        assert_eq!(listing.external_id, "v1|111|0");
        assert_eq!(listing.shipping, Decimal::ZERO);
        assert_eq!(listing.currency, "GBP");
    }

    #[test]
    fn ended_listing_is_inactive() {
        let as_of = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let raw = json!({
            "itemId": "v1|222|0",
            "price": {"value": "12.00", "currency": "GBP"},
            "itemEndDate": "2025-03-01T00:00:00Z",
        });
        assert!(!to_observed_listing(&raw, as_of).unwrap().is_active);
    }

    #[test]
    fn listing_without_price_fails() {
        let raw = json!({"itemId": "v1|333|0"});
        let err = to_observed_listing(&raw, Utc::now()).unwrap_err();
        assert!(matches!(err, PlatformError::Normalization { .. }));
    }
}

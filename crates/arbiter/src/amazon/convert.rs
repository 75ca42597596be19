//! Conversion of Amazon orders to normalized orders.

use rust_decimal::Decimal;

use super::types::{AmazonMoney, AmazonOrder, AmazonOrderItem};
use crate::entity::source::Source;
use crate::money::parse_amount;
use crate::platform::{LineItem, NormalizedOrder, PlatformError, RawRecord, Result};

/// Status used when the API omits `OrderStatus`.
const UNKNOWN_STATUS: &str = "Unknown";

fn amount(money: Option<&AmazonMoney>) -> Option<Decimal> {
    money?.amount.as_deref().and_then(parse_amount)
}

/// Map one `getOrders` entry to a normalized order.
///
/// Line items are not part of the summary, so the result has
/// `line_items_loaded == false`.
pub fn to_normalized_order(raw: &RawRecord) -> Result<NormalizedOrder> {
    let record = raw
        .get("AmazonOrderId")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>");
    let order: AmazonOrder = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record, e.to_string()))?;

    let total = order.order_total.as_ref();
    Ok(NormalizedOrder {
        source: Source::Amazon,
        external_id: order.amazon_order_id,
        order_date: order.purchase_date,
        updated_at: order.last_update_date.unwrap_or(order.purchase_date),
        counterparty: order.buyer_info.and_then(|b| b.buyer_email),
        status: order
            .order_status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        total: amount(total),
        currency: total.and_then(|m| m.currency_code.clone()),
        line_items: Vec::new(),
        line_items_loaded: false,
    })
}

/// Map `getOrderItems` lines. `ItemPrice` covers the whole line, so the unit
/// price is divided back out; a missing quantity counts as zero.
pub fn to_line_items(items: &[AmazonOrderItem]) -> Vec<LineItem> {
    items
        .iter()
        .map(|item| {
            let quantity = item.quantity_ordered.unwrap_or(0);
            let line_price = amount(item.item_price.as_ref());
            let unit_price = match line_price {
                Some(price) if quantity > 1 => Some(price / Decimal::from(quantity)),
                other => other,
            };
            LineItem {
                sku: item.seller_sku.clone().unwrap_or_default(),
                title: item.title.clone(),
                quantity,
                unit_price,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn order_maps_summary_fields() {
        let raw = json!({
            "AmazonOrderId": "202-1234567-1234567",
            "PurchaseDate": "2025-03-01T10:00:00Z",
            "LastUpdateDate": "2025-03-02T08:30:00Z",
            "OrderStatus": "Shipped",
            "OrderTotal": {"CurrencyCode": "GBP", "Amount": "129.99"},
            "BuyerInfo": {"BuyerEmail": "buyer@marketplace.amazon.co.uk"},
        });
        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.source, Source::Amazon);
        assert_eq!(order.external_id, "202-1234567-1234567");
        assert_eq!(
            order.updated_at,
            Utc.with_ymd_and_hms(2025, 3, 2, 8, 30, 0).unwrap()
        );
        assert_eq!(order.status, "Shipped");
        assert_eq!(order.total, Some(dec!(129.99)));
        assert_eq!(order.currency.as_deref(), Some("GBP"));
        assert!(!order.line_items_loaded);
    }

    #[test]
    fn order_substitutes_defaults_for_missing_fields() {
        let raw = json!({
            "AmazonOrderId": "202-0000000-0000001",
            "PurchaseDate": "2025-03-01T10:00:00Z",
        });
        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.status, "Unknown");
        assert_eq!(order.updated_at, order.order_date);
        assert_eq!(order.total, None);
        assert_eq!(order.counterparty, None);
    }

    #[test]
    fn order_without_purchase_date_fails_normalization() {
        let raw = json!({"AmazonOrderId": "202-0000000-0000002"});
        let err = to_normalized_order(&raw).unwrap_err();
        match err {
            PlatformError::Normalization { record, .. } => {
                assert_eq!(record, "202-0000000-0000002");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn line_items_divide_line_price_and_default_quantity() {
        let items: Vec<AmazonOrderItem> = serde_json::from_value(json!([
            {
                "SellerSKU": "SYNC-75192",
                "Title": "Millennium Falcon",
                "QuantityOrdered": 2,
                "ItemPrice": {"CurrencyCode": "GBP", "Amount": "100.00"},
            },
            {"SellerSKU": "40567"},
        ]))
        .unwrap();

        let lines = to_line_items(&items);
        assert_eq!(lines[0].sku, "SYNC-75192");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price, Some(dec!(50)));
        assert_eq!(lines[1].quantity, 0);
        assert_eq!(lines[1].unit_price, None);
    }
}

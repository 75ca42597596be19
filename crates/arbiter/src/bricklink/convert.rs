//! Conversion of BrickLink orders and price guide rows.

use rust_decimal::Decimal;

use super::types::{BrickLinkOrder, BrickLinkOrderItem, PriceDetail};
use crate::entity::source::Source;
use crate::money::parse_amount;
use crate::platform::{
    LineItem, NormalizedOrder, ObservedListing, PlatformError, RawRecord, Result,
};

const UNKNOWN_STATUS: &str = "Unknown";
const DEFAULT_CURRENCY: &str = "GBP";

fn record_id(raw: &RawRecord, field: &str) -> String {
    match raw.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) if !v.is_null() => v.to_string(),
        _ => "<unknown>".to_string(),
    }
}

/// Map one order summary. Line items need a second call.
pub fn to_normalized_order(raw: &RawRecord) -> Result<NormalizedOrder> {
    let order: BrickLinkOrder = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record_id(raw, "order_id"), e.to_string()))?;

    let cost = order.cost.as_ref();
    Ok(NormalizedOrder {
        source: Source::BrickLink,
        external_id: order.order_id.to_string(),
        order_date: order.date_ordered,
        updated_at: order.date_status_changed.unwrap_or(order.date_ordered),
        counterparty: order.buyer_name,
        status: order.status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        total: cost
            .and_then(|c| c.grand_total.as_deref())
            .and_then(parse_amount),
        currency: cost.and_then(|c| c.currency_code.clone()),
        line_items: Vec::new(),
        line_items_loaded: false,
    })
}

/// Map order lots. The SKU is taken from the lot remarks when the seller
/// filled them in, otherwise from the catalog number.
pub fn to_line_items(items: &[BrickLinkOrderItem]) -> Vec<LineItem> {
    items
        .iter()
        .map(|lot| {
            let sku = lot
                .remarks
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(&lot.item.no);
            LineItem {
                sku: sku.to_string(),
                title: lot.item.name.clone(),
                quantity: lot.quantity.unwrap_or(0),
                unit_price: lot.unit_price_final.as_deref().and_then(parse_amount),
            }
        })
        .collect()
}

/// Deterministic id for a price guide row, which carries none of its own.
///
/// `seen` counts earlier rows with the same key so identical lots stay
/// distinct.
pub fn listing_id(no: &str, condition: &str, unit_price: &str, quantity: i32, seen: u32) -> String {
    let base = format!("{no}-{condition}-{unit_price}-{quantity}");
    if seen == 0 { base } else { format!("{base}#{seen}") }
}

/// Map one price guide row. BrickLink quotes no shipping in the guide.
///
/// A lot reporting zero quantity has sold out and is kept as inactive.
pub fn to_observed_listing(raw: &RawRecord) -> Result<ObservedListing> {
    let row: PriceDetail = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record_id(raw, "listing_id"), e.to_string()))?;

    let price = parse_amount(&row.unit_price).ok_or_else(|| {
        PlatformError::normalization(&row.listing_id, format!("bad price {}", row.unit_price))
    })?;
    let condition = match row.new_or_used.as_deref() {
        Some("N") => Some("New".to_string()),
        Some("U") => Some("Used".to_string()),
        _ => None,
    };

    Ok(ObservedListing {
        external_id: row.listing_id,
        title: None,
        price,
        shipping: Decimal::ZERO,
        currency: row
            .currency_code
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        condition,
        is_active: row.quantity.is_none_or(|q| q > 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn order_uses_status_change_as_position() {
        let raw = json!({
            "order_id": 21450912,
            "date_ordered": "2025-03-01T10:00:00.000Z",
            "date_status_changed": "2025-03-02T08:30:00.000Z",
            "buyer_name": "bricks4u",
            "status": "PAID",
            "cost": {"currency_code": "GBP", "grand_total": "104.5000"},
        });
        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.source, Source::BrickLink);
        assert_eq!(order.external_id, "21450912");
        assert_eq!(order.status, "PAID");
        assert_eq!(order.total, Some(dec!(104.5)));
        assert_eq!(order.updated_at.to_rfc3339(), "2025-03-02T08:30:00+00:00");
        assert!(!order.line_items_loaded);
    }

    #[test]
    fn order_defaults_missing_fields() {
        let raw = json!({"order_id": 7, "date_ordered": "2025-03-01T10:00:00Z"});
        let order = to_normalized_order(&raw).unwrap();
        assert_eq!(order.status, "Unknown");
        assert_eq!(order.updated_at, order.order_date);
        assert_eq!(order.total, None);
    }

    #[test]
    fn malformed_order_names_the_record() {
        let err = to_normalized_order(&json!({"order_id": 99})).unwrap_err();
        match err {
            PlatformError::Normalization { record, .. } => assert_eq!(record, "99"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn line_item_sku_prefers_remarks() {
        let items: Vec<BrickLinkOrderItem> = serde_json::from_value(json!([
            {"item": {"no": "10294-1", "name": "Titanic"}, "quantity": 1,
             "unit_price_final": "599.99", "remarks": " SYNC-10294 "},
            {"item": {"no": "3001"}, "remarks": ""}
        ]))
        .unwrap();

        let lines = to_line_items(&items);
        assert_eq!(lines[0].sku, "SYNC-10294");
        assert_eq!(lines[0].unit_price, Some(dec!(599.99)));
        assert_eq!(lines[1].sku, "3001");
        assert_eq!(lines[1].quantity, 0);
    }

    #[test]
    fn listing_ids_disambiguate_identical_rows() {
        assert_eq!(listing_id("75192-1", "N", "600.00", 1, 0), "75192-1-N-600.00-1");
        assert_eq!(listing_id("75192-1", "N", "600.00", 1, 2), "75192-1-N-600.00-1#2");
    }

    #[test]
    fn price_row_maps_to_listing() {
        let raw = json!({
            "listing_id": "75192-1-N-612.5000-2",
            "quantity": 2,
            "unit_price": "612.5000",
            "currency_code": "GBP",
            "new_or_used": "N",
        });
        let listing = to_observed_listing(&raw).unwrap();
        assert_eq!(listing.total(), dec!(612.5));
        assert_eq!(listing.condition.as_deref(), Some("New"));
        assert!(listing.is_active);
    }

    #[test]
    fn sold_out_lot_is_inactive() {
        let raw = json!({
            "listing_id": "75192-1-U-540.0000-0",
            "quantity": 0,
            "unit_price": "540.0000",
            "new_or_used": "U",
        });
        let listing = to_observed_listing(&raw).unwrap();
        assert!(!listing.is_active);
        assert_eq!(listing.condition.as_deref(), Some("Used"));
    }

    #[test]
    fn price_row_with_bad_price_fails() {
        let raw = json!({"listing_id": "x", "unit_price": "n/a"});
        assert!(matches!(
            to_observed_listing(&raw).unwrap_err(),
            PlatformError::Normalization { .. }
        ));
    }
}

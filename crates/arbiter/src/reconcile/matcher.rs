//! Pure matching rules: which SKUs denote cross-listed items and where a
//! sold item must be removed from.

use rust_decimal::Decimal;

use crate::entity::source::Source;
use crate::platform::LineItem;

/// Item key carried by a cross-listing SKU, or `None` for ordinary SKUs.
///
/// The prefix match ignores ASCII case; surrounding whitespace is ignored.
pub fn item_key<'a>(sku: &'a str, prefix: &str) -> Option<&'a str> {
    let sku = sku.trim();
    if prefix.is_empty() || sku.len() <= prefix.len() || !sku.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = sku.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let key = rest.trim();
    (!key.is_empty()).then_some(key)
}

/// Sources the item must come off after selling on `sold_on`.
pub fn removal_targets(listed_on: &[Source], sold_on: Source) -> Vec<Source> {
    let mut targets: Vec<Source> = listed_on
        .iter()
        .copied()
        .filter(|s| *s != sold_on)
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

/// Price of one line: unit price times quantity, falling back to the order
/// total when the line has no price.
pub fn line_price(item: &LineItem, order_total: Option<Decimal>) -> Option<Decimal> {
    match item.unit_price {
        Some(unit) => Some(unit * Decimal::from(item.quantity.max(1))),
        None => order_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn item_key_strips_prefix() {
        assert_eq!(item_key("SYNC-75192", "SYNC-"), Some("75192"));
        assert_eq!(item_key("  sync-10497-1 ", "SYNC-"), Some("10497-1"));
    }

    #[test]
    fn item_key_rejects_plain_or_empty_skus() {
        assert_eq!(item_key("75192", "SYNC-"), None);
        assert_eq!(item_key("SYNC-", "SYNC-"), None);
        assert_eq!(item_key("SYNC-   ", "SYNC-"), None);
        assert_eq!(item_key("SYNC-1", ""), None);
        assert_eq!(item_key("SYN", "SYNC-"), None);
    }

    #[test]
    fn item_key_handles_multibyte_skus() {
        assert_eq!(item_key("£££££", "SYNC-"), None);
    }

    #[test]
    fn removal_targets_exclude_sale_source() {
        let listed = [Source::Ebay, Source::Amazon, Source::BrickLink, Source::Ebay];
        assert_eq!(
            removal_targets(&listed, Source::Ebay),
            vec![Source::Amazon, Source::BrickLink]
        );
        assert!(removal_targets(&[Source::Ebay], Source::Ebay).is_empty());
    }

    #[test]
    fn line_price_prefers_unit_price() {
        let mut item = LineItem {
            sku: "SYNC-75192".to_string(),
            title: None,
            quantity: 2,
            unit_price: Some(dec!(10.50)),
        };
        assert_eq!(line_price(&item, Some(dec!(99))), Some(dec!(21.00)));
        item.unit_price = None;
        assert_eq!(line_price(&item, Some(dec!(99))), Some(dec!(99)));
    }
}

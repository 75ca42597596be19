//! Conversion of Keepa products into price snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{KeepaProduct, KeepaStats};
use crate::money::from_minor;
use crate::platform::{PlatformError, PriceSnapshot, RawRecord, Result};

/// Minutes between the Unix epoch and 2011-01-01, Keepa's time origin.
pub const KEEPA_EPOCH_MINUTES: i64 = 21_564_000;

// CSV type indexes used by the engine.
const CSV_SALES_RANK: usize = 3;
const CSV_COUNT_NEW: usize = 11;
const CSV_BUY_BOX: usize = 18;

/// Convert a Keepa timestamp (minutes since 2011-01-01) to UTC.
pub fn keepa_minutes_to_datetime(minutes: i64) -> Option<DateTime<Utc>> {
    let unix_minutes = minutes.checked_add(KEEPA_EPOCH_MINUTES)?;
    DateTime::from_timestamp(unix_minutes.checked_mul(60)?, 0)
}

/// Convert a Keepa price in pence. Negative values mean "no price".
pub fn pence_to_amount(value: i64) -> Option<Decimal> {
    (value >= 0).then(|| from_minor(value))
}

/// Currency of a Keepa marketplace domain.
pub(super) fn domain_currency(domain: u8) -> &'static str {
    match domain {
        1 => "USD",
        3 | 4 | 8 | 9 => "EUR",
        5 => "JPY",
        6 => "CAD",
        10 => "INR",
        11 => "MXN",
        12 => "BRL",
        _ => "GBP",
    }
}

fn current(stats: Option<&KeepaStats>, index: usize) -> Option<i64> {
    stats?
        .current
        .get(index)
        .copied()
        .flatten()
        .filter(|v| *v >= 0)
}

/// Most recent non-negative value of a `[time, value, ...]` history.
fn last_history_value(csv: &[Option<Vec<i64>>], index: usize) -> Option<i64> {
    let history = csv.get(index)?.as_ref()?;
    history
        .chunks_exact(2)
        .rev()
        .map(|pair| pair[1])
        .find(|value| *value >= 0)
}

fn record_id(raw: &RawRecord) -> String {
    raw.get("asin")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Map one product object to a snapshot.
///
/// The buy box comes from `stats.current`; when Keepa has no current value
/// the latest point of the buy-box history is used instead.
pub fn to_price_snapshot(raw: &RawRecord, currency: &str) -> Result<PriceSnapshot> {
    let product: KeepaProduct = serde_json::from_value(raw.clone())
        .map_err(|e| PlatformError::normalization(record_id(raw), e.to_string()))?;

    if product.asin.trim().is_empty() {
        return Err(PlatformError::normalization("<unknown>", "product has no ASIN"));
    }

    let stats = product.stats.as_ref();
    let price = current(stats, CSV_BUY_BOX)
        .or_else(|| last_history_value(&product.csv, CSV_BUY_BOX))
        .and_then(pence_to_amount);
    let offer_count = current(stats, CSV_COUNT_NEW).and_then(|n| i32::try_from(n).ok());
    let observed_at = product
        .last_update
        .and_then(keepa_minutes_to_datetime)
        .unwrap_or_else(Utc::now);

    Ok(PriceSnapshot {
        external_id: product.asin,
        price,
        currency: currency.to_string(),
        offer_count,
        secondary_metric: current(stats, CSV_SALES_RANK),
        observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn current_with(buy_box: i64) -> Vec<i64> {
        let mut current = vec![-1; 19];
        current[CSV_SALES_RANK] = 1520;
        current[CSV_COUNT_NEW] = 7;
        current[CSV_BUY_BOX] = buy_box;
        current
    }

    #[test]
    fn keepa_epoch_is_2011() {
        assert_eq!(
            keepa_minutes_to_datetime(0),
            Some(Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            keepa_minutes_to_datetime(60),
            Some(Utc.with_ymd_and_hms(2011, 1, 1, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn negative_pence_is_no_price() {
        assert_eq!(pence_to_amount(-1), None);
        assert_eq!(pence_to_amount(0), Some(dec!(0.00)));
        assert_eq!(pence_to_amount(12999), Some(dec!(129.99)));
    }

    #[test]
    fn snapshot_uses_current_buy_box() {
        let raw = json!({
            "asin": "B0BXYZ1234",
            "lastUpdate": 7_000_000,
            "stats": {"current": current_with(8999)},
            "csv": [],
        });
        let snapshot = to_price_snapshot(&raw, "GBP").unwrap();
        assert_eq!(snapshot.external_id, "B0BXYZ1234");
        assert_eq!(snapshot.price, Some(dec!(89.99)));
        assert_eq!(snapshot.offer_count, Some(7));
        assert_eq!(snapshot.secondary_metric, Some(1520));
        assert_eq!(
            Some(snapshot.observed_at),
            keepa_minutes_to_datetime(7_000_000)
        );
    }

    #[test]
    fn snapshot_falls_back_to_latest_history_point() {
        let mut csv: Vec<Option<Vec<i64>>> = vec![None; 19];
        csv[CSV_BUY_BOX] = Some(vec![100, 4999, 200, 5499, 300, -1]);
        let raw = json!({
            "asin": "B0BXYZ1234",
            "stats": {"current": current_with(-1)},
            "csv": csv,
        });
        let snapshot = to_price_snapshot(&raw, "GBP").unwrap();
        assert_eq!(snapshot.price, Some(dec!(54.99)));
    }

    #[test]
    fn snapshot_without_any_price_is_still_valid() {
        let raw = json!({"asin": "B0BXYZ1234"});
        let snapshot = to_price_snapshot(&raw, "GBP").unwrap();
        assert_eq!(snapshot.price, None);
        assert_eq!(snapshot.offer_count, None);
        assert_eq!(snapshot.secondary_metric, None);
    }

    #[test]
    fn snapshot_rejects_products_without_asin() {
        let err = to_price_snapshot(&json!({"title": "no asin"}), "GBP").unwrap_err();
        assert!(matches!(err, PlatformError::Normalization { .. }));

        let err = to_price_snapshot(&json!({"asin": " "}), "GBP").unwrap_err();
        assert!(matches!(err, PlatformError::Normalization { .. }));
    }

    #[test]
    fn domain_currency_defaults_to_gbp() {
        assert_eq!(domain_currency(2), "GBP");
        assert_eq!(domain_currency(1), "USD");
        assert_eq!(domain_currency(3), "EUR");
        assert_eq!(domain_currency(99), "GBP");
    }
}

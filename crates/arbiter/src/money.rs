//! Conversions between decimal amounts and integer minor units.
//!
//! Normalized records carry `Decimal`; the database stores `i64` pence/cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert an amount to minor units, rounding half away from zero.
///
/// Returns `None` if the amount does not fit in an `i64`.
pub fn to_minor(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert minor units back to a two-decimal amount.
pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Parse a decimal string as sent by marketplace APIs ("12.34", " 5 ").
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.trim().parse::<Decimal>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn to_minor_rounds_half_away_from_zero() {
        assert_eq!(to_minor(dec!(12.345)), Some(1235));
        assert_eq!(to_minor(dec!(-0.005)), Some(-1));
        assert_eq!(to_minor(dec!(10)), Some(1000));
    }

    #[test]
    fn to_minor_returns_none_on_overflow() {
        assert_eq!(to_minor(Decimal::MAX), None);
    }

    #[test]
    fn from_minor_keeps_two_places() {
        assert_eq!(from_minor(1999), dec!(19.99));
        assert_eq!(from_minor(-50), dec!(-0.50));
    }

    #[test]
    fn parse_amount_trims_and_rejects_garbage() {
        assert_eq!(parse_amount(" 7.50 "), Some(dec!(7.50)));
        assert_eq!(parse_amount("n/a"), None);
    }
}

//! Margin arithmetic over landed costs.

use rust_decimal::Decimal;
use serde::Serialize;

/// Decimal places kept on averages and percentages.
const SCALE: u32 = 2;

/// Margin and cost-of-goods figures for one item (or one item and source).
///
/// Every figure is `None` when no listing is left or the sell price is
/// missing or not positive: "no data" is not "zero margin".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarginSummary {
    /// Listings that fed the figures.
    pub listing_count: usize,
    pub min_cost: Option<Decimal>,
    pub avg_cost: Option<Decimal>,
    pub max_cost: Option<Decimal>,
    pub margin_abs: Option<Decimal>,
    pub margin_pct: Option<Decimal>,
    pub cog_pct: Option<Decimal>,
}

impl MarginSummary {
    /// Compute the summary for a sell price and the landed costs that
    /// survived exclusion.
    pub fn compute(sell_price: Option<Decimal>, costs: &[Decimal]) -> Self {
        let (Some(&min), Some(&max)) = (costs.iter().min(), costs.iter().max()) else {
            return Self::default();
        };
        let total: Decimal = costs.iter().sum();
        let avg = (total / Decimal::from(costs.len())).round_dp(SCALE);

        let mut summary = Self {
            listing_count: costs.len(),
            min_cost: Some(min),
            avg_cost: Some(avg),
            max_cost: Some(max),
            ..Self::default()
        };

        if let Some(sell) = sell_price.filter(|p| *p > Decimal::ZERO) {
            let hundred = Decimal::ONE_HUNDRED;
            let margin = sell - min;
            summary.margin_abs = Some(margin);
            summary.margin_pct = Some((margin / sell * hundred).round_dp(SCALE));
            summary.cog_pct = Some((min / sell * hundred).round_dp(SCALE));
        }
        summary
    }

    pub fn has_data(&self) -> bool {
        self.listing_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn margin_uses_cheapest_cost() {
        let s = MarginSummary::compute(Some(dec!(20)), &[dec!(10), dec!(12), dec!(15)]);
        assert_eq!(s.listing_count, 3);
        assert_eq!(s.min_cost, Some(dec!(10)));
        assert_eq!(s.avg_cost, Some(dec!(12.33)));
        assert_eq!(s.max_cost, Some(dec!(15)));
        assert_eq!(s.margin_abs, Some(dec!(10)));
        assert_eq!(s.margin_pct, Some(dec!(50)));
        assert_eq!(s.cog_pct, Some(dec!(50)));
    }

    #[test]
    fn no_costs_means_no_data() {
        let s = MarginSummary::compute(Some(dec!(20)), &[]);
        assert!(!s.has_data());
        assert_eq!(s.margin_pct, None);
        assert_eq!(s.cog_pct, None);
    }

    #[test]
    fn non_positive_sell_price_yields_no_margin() {
        for sell in [Some(dec!(0)), Some(dec!(-5)), None] {
            let s = MarginSummary::compute(sell, &[dec!(10)]);
            assert_eq!(s.min_cost, Some(dec!(10)));
            assert_eq!(s.margin_abs, None);
            assert_eq!(s.margin_pct, None);
            assert_eq!(s.cog_pct, None);
        }
    }

    #[test]
    fn negative_margin_is_reported() {
        let s = MarginSummary::compute(Some(dec!(8)), &[dec!(10)]);
        assert_eq!(s.margin_abs, Some(dec!(-2)));
        assert_eq!(s.margin_pct, Some(dec!(-25)));
        assert_eq!(s.cog_pct, Some(dec!(125)));
    }
}

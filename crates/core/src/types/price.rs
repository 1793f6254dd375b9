//! Checkout price arithmetic using decimal amounts.
//!
//! Order prices are computed by the client at checkout and submitted with the
//! order; the server stores them as given. All amounts are in the store
//! currency's standard unit (dollars, not cents) and rounded to cents with
//! midpoints rounded away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Orders whose items total strictly more than this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Flat shipping charge applied below the free-shipping threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Sales tax rate applied to the items total (15%).
pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// The four price fields submitted with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    /// Sum of `price * qty` over all lines.
    pub items_price: Decimal,
    /// Shipping charge.
    pub shipping_price: Decimal,
    /// Tax on the items total.
    pub tax_price: Decimal,
    /// `items + shipping + tax`.
    pub total_price: Decimal,
}

impl PriceSummary {
    /// Compute the summary for `(unit price, quantity)` lines.
    #[must_use]
    pub fn for_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let items_price = round_cents(
            lines
                .into_iter()
                .map(|(price, qty)| price * Decimal::from(qty))
                .sum(),
        );

        let shipping_price = if items_price > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let tax_price = round_cents(TAX_RATE * items_price);
        let total_price = round_cents(items_price + shipping_price + tax_price);

        Self {
            items_price,
            shipping_price: round_cents(shipping_price),
            tax_price,
            total_price,
        }
    }
}

/// Round an amount to two decimal places, midpoints away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_constants() {
        assert_eq!(FREE_SHIPPING_THRESHOLD, dec("100"));
        assert_eq!(TAX_RATE, dec("0.15"));
    }

    #[test]
    fn test_small_order_pays_flat_shipping() {
        let summary = PriceSummary::for_lines([(dec("29.99"), 2)]);
        assert_eq!(summary.items_price, dec("59.98"));
        assert_eq!(summary.shipping_price, dec("100"));
        assert_eq!(summary.tax_price, dec("9.00"));
        assert_eq!(summary.total_price, dec("168.98"));
    }

    #[test]
    fn test_large_order_ships_free() {
        let summary = PriceSummary::for_lines([(dec("89.99"), 1), (dec("49.99"), 1)]);
        assert_eq!(summary.items_price, dec("139.98"));
        assert_eq!(summary.shipping_price, Decimal::ZERO);
        assert_eq!(summary.tax_price, dec("21.00"));
        assert_eq!(summary.total_price, dec("160.98"));
    }

    #[test]
    fn test_exactly_threshold_is_not_free() {
        let summary = PriceSummary::for_lines([(dec("50"), 2)]);
        assert_eq!(summary.shipping_price, dec("100"));
    }

    #[test]
    fn test_empty_cart() {
        let summary = PriceSummary::for_lines(std::iter::empty());
        assert_eq!(summary.items_price, Decimal::ZERO);
        assert_eq!(summary.tax_price, Decimal::ZERO);
        assert_eq!(summary.total_price, dec("100"));
    }

    #[test]
    fn test_round_cents_midpoint() {
        assert_eq!(round_cents(dec("1.005")), dec("1.01"));
        assert_eq!(round_cents(dec("2.004")), dec("2.00"));
    }
}

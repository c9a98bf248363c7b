//! Decimal helpers for money and quantities.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` rounded to two places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for monetary amounts.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept for stock quantities.
pub const QUANTITY_DP: u32 = 3;

/// Rounds an amount to two decimal places, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a quantity to three decimal places, midpoint away from zero.
#[must_use]
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(10.005), dec!(10.01))]
    #[case(dec!(10.004), dec!(10.00))]
    #[case(dec!(-10.005), dec!(-10.01))]
    #[case(dec!(3), dec!(3))]
    fn test_round_money(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_money(input), expected);
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(dec!(1.2345)), dec!(1.235));
        assert_eq!(round_quantity(dec!(2)), dec!(2));
    }
}

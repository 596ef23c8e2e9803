//! Monetary rounding and clamping helpers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places every finalized amount carries.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Rounds a finalized amount to cents, midpoint away from zero.
///
/// # Examples
///
/// ```
/// use statutory_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("10.005").unwrap()), Decimal::from_str("10.01").unwrap());
/// assert_eq!(round_money(Decimal::from_str("10.004").unwrap()), Decimal::from_str("10.00").unwrap());
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps an amount at zero.
pub fn non_negative(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// Applies a percentage rate (3 = 3%) to an amount, unrounded.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

/// Rounds and clamps an amount in one step.
pub fn finalize(amount: Decimal) -> Decimal {
    non_negative(round_money(amount))
}

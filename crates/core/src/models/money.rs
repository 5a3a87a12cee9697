//! Conversions between stored minor units and two-place decimal amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Scale used for every amount in the system.
pub const MONEY_SCALE: u32 = 2;

/// Converts stored cents into a decimal with two fractional digits.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Converts an amount into cents, rounding half away from zero to two places.
///
/// Returns `None` when the amount does not fit in an `i64` number of cents.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let rounded = amount.round_dp_with_strategy(
        MONEY_SCALE,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    rounded.checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

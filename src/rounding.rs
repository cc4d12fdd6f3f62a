//! Cash Rounding

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Errors that can occur while rounding to a cash increment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundingError {
    /// The increment must be positive (minor units).
    #[error("cash rounding increment {0} must be positive")]
    InvalidIncrement(i64),

    /// The rounded amount does not fit in minor units.
    #[error("rounding {0} overflows")]
    Overflow(i64),
}

/// Round `amount` to the nearest multiple of `increment` minor units.
///
/// Halves round away from zero: with an increment of 100, 150 becomes 200 and -150
/// becomes -200.
///
/// # Errors
///
/// - [`RoundingError::InvalidIncrement`]: `increment` is zero or negative.
/// - [`RoundingError::Overflow`]: the rounded amount cannot be represented.
pub fn round_to_increment<'a>(
    amount: Money<'a, Currency>,
    increment: i64,
) -> Result<Money<'a, Currency>, RoundingError> {
    let rounded = round_minor(amount.to_minor_units(), increment)?;

    Ok(Money::from_minor(rounded, amount.currency()))
}

/// Round `minor` units to the nearest multiple of `increment`.
///
/// # Errors
///
/// See [`round_to_increment`].
pub fn round_minor(minor: i64, increment: i64) -> Result<i64, RoundingError> {
    if increment <= 0 {
        return Err(RoundingError::InvalidIncrement(increment));
    }

    let remainder = minor % increment;
    let base = minor - remainder;

    // Compare doubled remainder to avoid losing the half on odd increments.
    let rounds_out = i128::from(remainder).abs() * 2 >= i128::from(increment);

    if !rounds_out {
        return Ok(base);
    }

    let step = if minor < 0 { -increment } else { increment };

    base.checked_add(step).ok_or(RoundingError::Overflow(minor))
}

//! Group Allocation
//!
//! Splits a bundle total across the bundle's lines in proportion to their quantities.
//! Line totals always sum exactly to the bundle total.
//!
//! Each share is computed exactly in integer arithmetic and rounded half away from zero.
//! The rounding residual is then settled one minor unit per line, walking from the last
//! line back to the first until nothing is left. A line already at zero is passed over
//! when units are taken back, so no line goes negative.

use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

/// Errors that can occur while allocating a group total.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// Group totals cannot be negative (minor units).
    #[error("cannot allocate negative total {0}")]
    NegativeTotal(i64),

    /// A non-zero total was given with no lines to receive it (minor units).
    #[error("cannot allocate {0} across zero lines")]
    UnallocatedTotal(i64),

    /// An intermediate product does not fit in minor units.
    #[error("allocation overflowed")]
    Overflow,

    /// Internal invariant was violated (this is a bug).
    #[error("allocation invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Allocated line totals, in input order.
pub type Allocation<'a> = SmallVec<[Money<'a, Currency>; 10]>;

/// Allocates `group_total` across lines with the given quantities.
///
/// # Errors
///
/// See [`allocate_minor`].
pub fn allocate<'a>(
    quantities: &[u32],
    group_total: Money<'a, Currency>,
) -> Result<Allocation<'a>, AllocationError> {
    let currency = group_total.currency();

    Ok(allocate_minor(quantities, group_total.to_minor_units())?
        .into_iter()
        .map(|minor| Money::from_minor(minor, currency))
        .collect())
}

/// Allocates `group_total` minor units across lines with the given quantities.
///
/// A single line receives the whole total. An empty slice is only valid for a zero total.
///
/// # Errors
///
/// - [`AllocationError::NegativeTotal`]: `group_total` is below zero.
/// - [`AllocationError::UnallocatedTotal`]: `quantities` is empty but `group_total` is not zero.
/// - [`AllocationError::Overflow`]: an intermediate value does not fit in minor units.
pub fn allocate_minor(
    quantities: &[u32],
    group_total: i64,
) -> Result<SmallVec<[i64; 10]>, AllocationError> {
    if group_total < 0 {
        return Err(AllocationError::NegativeTotal(group_total));
    }

    if quantities.is_empty() {
        return if group_total == 0 {
            Ok(SmallVec::new())
        } else {
            Err(AllocationError::UnallocatedTotal(group_total))
        };
    }

    let total_qty = match quantities.iter().map(|&q| i128::from(q)).sum::<i128>() {
        0 => 1,
        sum => sum,
    };

    let total = i128::from(group_total);

    let mut shares: SmallVec<[i64; 10]> = smallvec![0; quantities.len()];

    let mut allocated: i128 = 0;

    for (share, &qty) in shares.iter_mut().zip(quantities) {
        let numerator = total
            .checked_mul(i128::from(qty))
            .ok_or(AllocationError::Overflow)?;

        let rounded = round_half_away_from_zero(numerator, total_qty);

        *share = i64::try_from(rounded).map_err(|_err| AllocationError::Overflow)?;

        allocated += rounded;
    }

    let mut diff = total - allocated;

    for share in shares.iter_mut().rev() {
        if diff == 0 {
            break;
        }

        if diff > 0 {
            *share += 1;
            diff -= 1;
        } else if *share > 0 {
            *share -= 1;
            diff += 1;
        }
    }

    if diff != 0 {
        return Err(AllocationError::InvariantViolation {
            message: "rounding residual left after a full pass",
        });
    }

    Ok(shares)
}

/// `numerator / denominator` rounded half away from zero, for non-negative inputs.
fn round_half_away_from_zero(numerator: i128, denominator: i128) -> i128 {
    (2 * numerator + denominator) / (2 * denominator)
}

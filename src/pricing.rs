//! Tiered Pricing
//!
//! Finds the cheapest way to buy an exact quantity given a set of multi-buy tiers and a
//! per-unit fallback price. This is an unbounded knapsack: every tier can be used any
//! number of times, and single units can always fill the gaps.

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::tiers::TierSet;

/// Errors that can occur while computing a tiered total.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The per-unit fallback price is negative (minor units).
    #[error("unit price {0} is negative")]
    NegativeUnitPrice(i64),

    /// Tier currency differs from the unit price currency (tier currency, unit currency).
    #[error("tiers are priced in {0}, but unit price is in {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The total does not fit in minor units.
    #[error("total for quantity {quantity} overflows")]
    Overflow {
        /// Quantity being priced
        quantity: u32,
    },

    /// Internal invariant was violated (this is a bug).
    #[error("pricing invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Calculates the minimum total for exactly `quantity` units.
///
/// Quantity zero costs nothing. With no tiers the result is `quantity * unit_price`.
///
/// # Errors
///
/// - [`PricingError::NegativeUnitPrice`]: `unit_price` is below zero.
/// - [`PricingError::CurrencyMismatch`]: tiers and unit price use different currencies.
/// - [`PricingError::Overflow`]: the total cannot be represented in minor units.
pub fn minimum_total<'a>(
    quantity: u32,
    tiers: &TierSet<'a>,
    unit_price: Money<'a, Currency>,
) -> Result<Money<'a, Currency>, PricingError> {
    let unit = checked_unit_price(tiers, &unit_price)?;

    if quantity == 0 {
        return Ok(Money::from_minor(0, unit_price.currency()));
    }

    if tiers.is_empty() {
        let total = i64::from(quantity)
            .checked_mul(unit)
            .ok_or(PricingError::Overflow { quantity })?;

        return Ok(Money::from_minor(total, unit_price.currency()));
    }

    let costs = cost_table(quantity, tiers, unit)?;

    let total = costs
        .last()
        .copied()
        .ok_or(PricingError::InvariantViolation {
            message: "cost table is empty",
        })?;

    Ok(Money::from_minor(total, unit_price.currency()))
}

/// Calculates the minimum total for every quantity from `0` to `max_quantity` inclusive.
///
/// Entry `n` of the result is what [`minimum_total`] returns for quantity `n`.
///
/// # Errors
///
/// Same as [`minimum_total`].
pub fn minimum_totals<'a>(
    max_quantity: u32,
    tiers: &TierSet<'a>,
    unit_price: Money<'a, Currency>,
) -> Result<Vec<Money<'a, Currency>>, PricingError> {
    let unit = checked_unit_price(tiers, &unit_price)?;
    let currency = unit_price.currency();

    let costs = cost_table(max_quantity, tiers, unit)?;

    Ok(costs
        .into_iter()
        .map(|minor| Money::from_minor(minor, currency))
        .collect())
}

fn checked_unit_price(
    tiers: &TierSet<'_>,
    unit_price: &Money<'_, Currency>,
) -> Result<i64, PricingError> {
    let unit = unit_price.to_minor_units();

    if unit < 0 {
        return Err(PricingError::NegativeUnitPrice(unit));
    }

    if let Some(tier_currency) = tiers.currency()
        && tier_currency != unit_price.currency()
    {
        return Err(PricingError::CurrencyMismatch(
            tier_currency.iso_alpha_code,
            unit_price.currency().iso_alpha_code,
        ));
    }

    Ok(unit)
}

/// Bottom-up DP: `costs[i]` is the cheapest way to buy exactly `i` units.
///
/// `costs[i] = min(costs[i - 1] + unit, min over tiers (costs[i - tier.quantity] + tier.total))`
fn cost_table(quantity: u32, tiers: &TierSet<'_>, unit: i64) -> Result<Vec<i64>, PricingError> {
    let len = usize::try_from(quantity)
        .ok()
        .and_then(|q| q.checked_add(1))
        .ok_or(PricingError::Overflow { quantity })?;

    let mut costs: Vec<i64> = Vec::with_capacity(len);
    costs.push(0);

    for target in 1..len {
        let previous = costs
            .last()
            .copied()
            .ok_or(PricingError::InvariantViolation {
                message: "cost table lost its base case",
            })?;

        let mut best = previous
            .checked_add(unit)
            .ok_or(PricingError::Overflow { quantity })?;

        for tier in tiers.iter() {
            let Ok(covered) = usize::try_from(tier.quantity()) else {
                continue;
            };

            let Some(remaining) = target.checked_sub(covered) else {
                continue;
            };

            let base = costs
                .get(remaining)
                .copied()
                .ok_or(PricingError::InvariantViolation {
                    message: "cost table entry missing for smaller quantity",
                })?;

            let candidate = base
                .checked_add(tier.total().to_minor_units())
                .ok_or(PricingError::Overflow { quantity })?;

            best = best.min(candidate);
        }

        costs.push(best);
    }

    Ok(costs)
}

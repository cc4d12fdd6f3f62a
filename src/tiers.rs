//! Price Tiers
//!
//! A tier is a multi-buy offer: "buy exactly `quantity` units for `total`". Tiers are
//! validated when they are built, so a [`TierSet`] handed to the pricing engine never
//! contains a zero-quantity or negative-priced entry.

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

/// Errors raised for malformed tier configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierError {
    /// A single tier was built for zero units.
    #[error("tier covers zero units")]
    ZeroTierQuantity,

    /// A single tier was built with a negative total (minor units).
    #[error("tier has negative total {0}")]
    NegativeTierTotal(i64),

    /// A tier in a set covers zero units (index).
    #[error("tier {0} covers zero units")]
    ZeroQuantity(usize),

    /// A tier total cannot be negative (index, total in minor units).
    #[error("tier {0} has negative total {1}")]
    NegativeTotal(usize, i64),

    /// A tier's currency differs from the rest of the set (index, tier currency, set currency).
    #[error("tier {0} has currency {1}, but tier set has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),
}

/// A single multi-buy offer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTier<'a> {
    quantity: u32,
    total: Money<'a, Currency>,
}

impl<'a> PriceTier<'a> {
    /// Create a tier covering `quantity` units for `total`.
    ///
    /// # Errors
    ///
    /// - [`TierError::ZeroTierQuantity`]: `quantity` is zero.
    /// - [`TierError::NegativeTierTotal`]: `total` is below zero.
    pub fn new(quantity: u32, total: Money<'a, Currency>) -> Result<Self, TierError> {
        if quantity == 0 {
            return Err(TierError::ZeroTierQuantity);
        }

        if total.to_minor_units() < 0 {
            return Err(TierError::NegativeTierTotal(total.to_minor_units()));
        }

        Ok(Self { quantity, total })
    }

    /// Number of units covered by this tier.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Price for exactly [`quantity`](Self::quantity) units.
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }
}

/// The tiers offered for one product or bundle.
///
/// An empty set means flat unit pricing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierSet<'a> {
    tiers: SmallVec<[PriceTier<'a>; 6]>,
}

impl<'a> TierSet<'a> {
    /// A tier set with no offers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tier set from raw `(quantity, total)` pairs.
    ///
    /// Tiers are kept largest quantity first. Evaluation does not depend on this order.
    ///
    /// # Errors
    ///
    /// Returns a [`TierError`] naming the first offending tier by its input index.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (u32, Money<'a, Currency>)>,
    ) -> Result<Self, TierError> {
        let mut tiers: SmallVec<[PriceTier<'a>; 6]> = SmallVec::new();
        let mut currency: Option<&Currency> = None;

        for (idx, (quantity, total)) in pairs.into_iter().enumerate() {
            let tier = PriceTier::new(quantity, total).map_err(|err| match err {
                TierError::ZeroTierQuantity => TierError::ZeroQuantity(idx),
                TierError::NegativeTierTotal(minor) => TierError::NegativeTotal(idx, minor),
                other => other,
            })?;

            let tier_currency = total.currency();

            match currency {
                Some(expected) if expected != tier_currency => {
                    return Err(TierError::CurrencyMismatch(
                        idx,
                        tier_currency.iso_alpha_code,
                        expected.iso_alpha_code,
                    ));
                }
                Some(_) => {}
                None => currency = Some(tier_currency),
            }

            tiers.push(tier);
        }

        tiers.sort_by(|a, b| b.quantity.cmp(&a.quantity));

        Ok(Self { tiers })
    }

    /// Iterate over the tiers, largest quantity first.
    pub fn iter(&self) -> impl Iterator<Item = &PriceTier<'a>> {
        self.tiers.iter()
    }

    /// Number of tiers in the set.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// True when the set has no tiers.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Currency shared by the tiers, if any are present.
    pub fn currency(&self) -> Option<&'a Currency> {
        self.tiers.first().map(|tier| tier.total.currency())
    }
}

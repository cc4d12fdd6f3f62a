//! Bundle Grouping
//!
//! Cart lines whose products share a bundle code are priced together: the bundle's
//! combined quantity goes through the tier calculator, then the bundle total is allocated
//! back to the lines. Everything else is priced as `quantity * unit price`.
//!
//! A bundle is only priced as a group when its first line's product has tiers and every
//! line has the same unit price. Inconsistent bundles quietly fall back to unit pricing.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    allocation::{AllocationError, allocate},
    pricing::{PricingError, minimum_total},
    products::Product,
};

/// Errors that can occur while pricing cart lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// Wrapped tier calculation error.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Wrapped allocation error.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// A line total does not fit in minor units (line index).
    #[error("line {0} total overflows")]
    Overflow(usize),

    /// Internal invariant was violated (this is a bug).
    #[error("bundle invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// A cart line with its product resolved.
#[derive(Debug, Clone, Copy)]
pub struct CartLine<'p, 'a> {
    /// Product being bought
    pub product: &'p Product<'a>,

    /// Units bought
    pub quantity: u32,
}

impl<'p, 'a> CartLine<'p, 'a> {
    /// Create a cart line.
    pub fn new(product: &'p Product<'a>, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

/// Lines that share a bundle code, or a single unbundled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineGroup<'p> {
    /// Shared bundle code, `None` for an unbundled line
    pub bundle: Option<&'p str>,

    /// Indexes of the member lines, in cart order
    pub members: SmallVec<[usize; 10]>,
}

/// Price computed for one cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine<'a> {
    /// Amount charged for the line
    pub line_total: Money<'a, Currency>,

    /// Bundle code when the line was priced as part of a bundle
    pub bundle: Option<String>,
}

/// Group cart lines by bundle code.
///
/// Groups appear in order of their first line. Unbundled lines each get their own group.
pub fn group_lines<'p>(lines: &[CartLine<'p, '_>]) -> SmallVec<[LineGroup<'p>; 10]> {
    let mut groups: SmallVec<[LineGroup<'p>; 10]> = SmallVec::new();
    let mut by_code: FxHashMap<&'p str, usize> = FxHashMap::default();

    for (idx, line) in lines.iter().enumerate() {
        let product: &'p Product<'_> = line.product;

        let Some(code) = product.bundle() else {
            groups.push(LineGroup {
                bundle: None,
                members: SmallVec::from_slice(&[idx]),
            });

            continue;
        };

        match by_code.get(code).copied() {
            Some(pos) => {
                if let Some(group) = groups.get_mut(pos) {
                    group.members.push(idx);
                }
            }
            None => {
                by_code.insert(code, groups.len());

                groups.push(LineGroup {
                    bundle: Some(code),
                    members: SmallVec::from_slice(&[idx]),
                });
            }
        }
    }

    groups
}

/// Price every cart line, returning totals in cart order.
///
/// # Errors
///
/// Returns a [`BundleError`] if tier pricing or allocation fails, or a total overflows.
pub fn price_lines<'a>(
    lines: &[CartLine<'_, 'a>],
) -> Result<SmallVec<[PricedLine<'a>; 10]>, BundleError> {
    let mut priced: SmallVec<[Option<PricedLine<'a>>; 10]> =
        lines.iter().map(|_| None).collect();

    for group in group_lines(lines) {
        let members = member_lines(lines, &group)?;

        match group.bundle {
            Some(code) if is_priced_as_bundle(&members) => {
                price_bundle(&mut priced, &group, &members, code)?;
            }
            _ => {
                for (&idx, line) in group.members.iter().zip(&members) {
                    let slot = priced.get_mut(idx).ok_or(BundleError::InvariantViolation {
                        message: "line index out of range",
                    })?;

                    *slot = Some(PricedLine {
                        line_total: unit_total(idx, line)?,
                        bundle: None,
                    });
                }
            }
        }
    }

    priced
        .into_iter()
        .map(|line| {
            line.ok_or(BundleError::InvariantViolation {
                message: "cart line was not priced",
            })
        })
        .collect()
}

fn member_lines<'l, 'p, 'a>(
    lines: &'l [CartLine<'p, 'a>],
    group: &LineGroup<'_>,
) -> Result<SmallVec<[&'l CartLine<'p, 'a>; 10]>, BundleError> {
    group
        .members
        .iter()
        .map(|&idx| {
            lines.get(idx).ok_or(BundleError::InvariantViolation {
                message: "group member index out of range",
            })
        })
        .collect()
}

/// A bundle is priced as a group when it has tiers and a uniform unit price.
fn is_priced_as_bundle(members: &[&CartLine<'_, '_>]) -> bool {
    let Some(first) = members.first() else {
        return false;
    };

    !first.product.bulk_pricing.is_empty()
        && members
            .iter()
            .all(|line| line.product.price == first.product.price)
}

fn price_bundle<'a>(
    priced: &mut [Option<PricedLine<'a>>],
    group: &LineGroup<'_>,
    members: &[&CartLine<'_, 'a>],
    code: &str,
) -> Result<(), BundleError> {
    let first = members.first().ok_or(BundleError::InvariantViolation {
        message: "bundle has no members",
    })?;

    let quantities: SmallVec<[u32; 10]> = members.iter().map(|line| line.quantity).collect();

    let total_qty = quantities
        .iter()
        .try_fold(0u32, |acc, &q| acc.checked_add(q))
        .ok_or(BundleError::Overflow(group.members.first().copied().unwrap_or_default()))?;

    let group_total = minimum_total(total_qty, &first.product.bulk_pricing, first.product.price)?;
    let shares = allocate(&quantities, group_total)?;

    for (&idx, share) in group.members.iter().zip(shares) {
        let slot = priced.get_mut(idx).ok_or(BundleError::InvariantViolation {
            message: "line index out of range",
        })?;

        *slot = Some(PricedLine {
            line_total: share,
            bundle: Some(code.to_string()),
        });
    }

    Ok(())
}

fn unit_total<'a>(idx: usize, line: &CartLine<'_, 'a>) -> Result<Money<'a, Currency>, BundleError> {
    let price = line.product.price;

    let total = price
        .to_minor_units()
        .checked_mul(i64::from(line.quantity))
        .ok_or(BundleError::Overflow(idx))?;

    Ok(Money::from_minor(total, price.currency()))
}

//! Integration tests for multi-buy tier pricing, allocation and bundle grouping.
//!
//! The facial-care ladder used throughout:
//!
//! | Qty | Total   | Per unit |
//! |-----|---------|----------|
//! | 1   | 125,000 | 125,000  |
//! | 2   | 240,000 | 120,000  |
//! | 3   | 330,000 | 110,000  |
//! | 4   | 420,000 | 105,000  |
//! | 5   | 500,000 | 100,000  |
//!
//! Seven units cost 740,000 (5 + 2). Buying them one at a time would cost 875,000.

use proptest::prelude::*;
use rusty_money::{
    Money,
    iso::{Currency, IDR},
};
use testresult::TestResult;

use kasir::{
    allocation::{allocate, allocate_minor},
    bundles::{CartLine, price_lines},
    pricing::{minimum_total, minimum_totals},
    products::Product,
    tiers::{TierError, TierSet},
};

fn idr(major: i64) -> Money<'static, Currency> {
    Money::from_major(major, IDR)
}

fn facial_care() -> Result<TierSet<'static>, TierError> {
    TierSet::from_pairs([
        (1, idr(125_000)),
        (2, idr(240_000)),
        (3, idr(330_000)),
        (4, idr(420_000)),
        (5, idr(500_000)),
    ])
}

/// Exhaustive minimum over every way of writing `quantity` as tier and unit purchases.
fn brute_force(quantity: u32, tiers: &[(u32, i64)], unit: i64) -> i64 {
    if quantity == 0 {
        return 0;
    }

    let mut best = unit + brute_force(quantity - 1, tiers, unit);

    for &(size, total) in tiers {
        if size <= quantity {
            best = best.min(total + brute_force(quantity - size, tiers, unit));
        }
    }

    best
}

#[test]
fn seven_units_use_five_plus_two() -> TestResult {
    let total = minimum_total(7, &facial_care()?, idr(160_000))?;

    assert_eq!(total, idr(740_000));

    Ok(())
}

#[test]
fn zero_units_cost_nothing() -> TestResult {
    let total = minimum_total(0, &facial_care()?, idr(160_000))?;

    assert_eq!(total, idr(0));

    Ok(())
}

#[test]
fn single_unit_tier_degenerates_to_flat_pricing() -> TestResult {
    let tiers = TierSet::from_pairs([(1, idr(50_000))])?;

    assert_eq!(minimum_total(3, &tiers, idr(50_000))?, idr(150_000));

    Ok(())
}

#[test]
fn empty_tiers_fall_back_to_unit_price() -> TestResult {
    assert_eq!(
        minimum_total(4, &TierSet::empty(), idr(144_000))?,
        idr(576_000)
    );

    Ok(())
}

#[test]
fn per_unit_cost_falls_along_the_ladder() -> TestResult {
    let totals = minimum_totals(5, &facial_care()?, idr(160_000))?;

    // Compare a/qa >= b/qb as a*qb >= b*qa to stay in integers.
    let per_unit: Vec<(i64, i64)> = (1i64..)
        .zip(totals.iter().skip(1))
        .map(|(qty, total)| (total.to_minor_units(), qty))
        .collect();

    for pair in per_unit.windows(2) {
        let [(a, qa), (b, qb)] = pair else {
            continue;
        };

        assert!(a * qb >= b * qa, "per-unit cost rose from {a}/{qa} to {b}/{qb}");
    }

    Ok(())
}

#[test]
fn bundle_total_is_split_by_quantity() -> TestResult {
    let shares = allocate(&[2, 3, 5], idr(740_000))?;

    assert_eq!(shares.as_slice(), [idr(148_000), idr(222_000), idr(370_000)]);

    Ok(())
}

#[test]
fn uneven_split_still_sums_to_total() -> TestResult {
    let shares = allocate_minor(&[1, 1, 1], 100)?;

    assert_eq!(shares.iter().sum::<i64>(), 100);
    assert!(shares.iter().all(|&share| share == 33 || share == 34));

    Ok(())
}

#[test]
fn ladder_matches_brute_force() -> TestResult {
    let tiers = facial_care()?;
    let raw: Vec<(u32, i64)> = tiers
        .iter()
        .map(|tier| (tier.quantity(), tier.total().to_minor_units()))
        .collect();
    let unit = idr(160_000);

    let totals = minimum_totals(15, &tiers, unit)?;

    for (quantity, total) in (0u32..).zip(&totals) {
        assert_eq!(
            total.to_minor_units(),
            brute_force(quantity, &raw, unit.to_minor_units()),
            "quantity {quantity}"
        );
    }

    Ok(())
}

#[test]
fn mixed_bundle_cart_prices_bundle_and_loose_lines() -> TestResult {
    let tiers = facial_care()?;

    let toner = Product::new("T128", "Toner", idr(160_000))
        .with_stock(10)
        .with_bundle("facial-care", tiers.clone());
    let mousse = Product::new("FB403", "Mousse", idr(144_000)).with_stock(10);
    let daycream = Product::new("CF311", "Daycream", idr(160_000))
        .with_stock(10)
        .with_bundle("facial-care", tiers);

    let lines = [
        CartLine::new(&toner, 2),
        CartLine::new(&mousse, 1),
        CartLine::new(&daycream, 5),
    ];

    let priced = price_lines(&lines)?;

    let bundled: i64 = priced
        .iter()
        .filter(|line| line.bundle.as_deref() == Some("facial-care"))
        .map(|line| line.line_total.to_minor_units())
        .sum();

    assert_eq!(priced.len(), 3);
    assert_eq!(bundled, idr(740_000).to_minor_units());
    assert_eq!(priced.get(1).map(|line| line.line_total), Some(idr(144_000)));
    assert_eq!(priced.get(1).and_then(|line| line.bundle.clone()), None);

    Ok(())
}

#[test]
fn bundle_with_mixed_unit_prices_falls_back() -> TestResult {
    let tiers = facial_care()?;

    let toner =
        Product::new("T128", "Toner", idr(160_000)).with_bundle("facial-care", tiers.clone());
    let odd = Product::new("X1", "Odd", idr(150_000)).with_bundle("facial-care", tiers);

    let priced = price_lines(&[CartLine::new(&toner, 1), CartLine::new(&odd, 1)])?;

    let totals: Vec<_> = priced.iter().map(|line| line.line_total).collect();

    assert_eq!(totals, vec![idr(160_000), idr(150_000)]);
    assert!(priced.iter().all(|line| line.bundle.is_none()));

    Ok(())
}

fn tier_strategy() -> impl Strategy<Value = Vec<(u32, i64)>> {
    prop::collection::vec((1u32..=6, 0i64..2_000), 0..5)
}

proptest! {
    #[test]
    fn minimum_total_is_optimal(
        tiers in tier_strategy(),
        unit in 0i64..1_000,
        quantity in 0u32..20,
    ) {
        let set = TierSet::from_pairs(
            tiers.iter().map(|&(qty, total)| (qty, Money::from_minor(total, IDR))),
        ).map_err(|err| TestCaseError::fail(err.to_string()))?;

        let total = minimum_total(quantity, &set, Money::from_minor(unit, IDR))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        prop_assert_eq!(total.to_minor_units(), brute_force(quantity, &tiers, unit));
        prop_assert!(total.to_minor_units() <= i64::from(quantity) * unit);
    }

    #[test]
    fn minimum_total_is_subadditive(
        tiers in tier_strategy(),
        unit in 0i64..1_000,
        a in 0u32..12,
        b in 0u32..12,
    ) {
        let set = TierSet::from_pairs(
            tiers.iter().map(|&(qty, total)| (qty, Money::from_minor(total, IDR))),
        ).map_err(|err| TestCaseError::fail(err.to_string()))?;

        let unit = Money::from_minor(unit, IDR);
        let price = |quantity| {
            minimum_total(quantity, &set, unit)
                .map(|total| total.to_minor_units())
                .map_err(|err| TestCaseError::fail(err.to_string()))
        };

        prop_assert!(price(a + b)? <= price(a)? + price(b)?);
    }

    #[test]
    fn allocation_is_exact_and_close_to_share(
        quantities in prop::collection::vec(1u32..50, 1..8),
        total in 0i64..10_000_000,
    ) {
        let shares = allocate_minor(&quantities, total)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let total_qty: i128 = quantities.iter().map(|&qty| i128::from(qty)).sum();

        prop_assert_eq!(shares.len(), quantities.len());
        prop_assert_eq!(shares.iter().sum::<i64>(), total);

        // Rounding moves a line by at most half a unit and the residual walk by one more.
        for (&share, &qty) in shares.iter().zip(&quantities) {
            let error = (i128::from(share) * total_qty - i128::from(total) * i128::from(qty)).abs();

            prop_assert!(share >= 0);
            prop_assert!(2 * error <= 3 * total_qty, "share {} for qty {} is off by more than 1.5 units", share, qty);
        }
    }

    #[test]
    fn allocation_walks_residual_back_from_last_line(
        quantities in prop::collection::vec(1u32..50, 1..8),
        total in 0i64..10_000_000,
    ) {
        let shares = allocate_minor(&quantities, total)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let total_qty: i128 = quantities.iter().map(|&qty| i128::from(qty)).sum();

        let mut expected: Vec<i64> = quantities
            .iter()
            .map(|&qty| {
                let numerator = i128::from(total) * i128::from(qty);

                i64::try_from((2 * numerator + total_qty) / (2 * total_qty)).unwrap_or(i64::MAX)
            })
            .collect();

        let mut diff = total - expected.iter().sum::<i64>();

        for share in expected.iter_mut().rev() {
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

        prop_assert_eq!(shares.as_slice(), expected.as_slice());
    }

    #[test]
    fn single_line_receives_everything(qty in 1u32..100, total in 0i64..10_000_000) {
        let shares = allocate_minor(&[qty], total)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        prop_assert_eq!(shares.as_slice(), [total]);
    }
}

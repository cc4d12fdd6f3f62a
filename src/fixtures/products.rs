//! Product catalog fixtures

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, IDR, SGD, USD},
};
use serde::Deserialize;

use crate::{fixtures::FixtureError, products::Product, tiers::TierSet};

/// Top level of a products file: fixture names mapped to products.
#[derive(Debug, Deserialize)]
pub struct ProductsFixture {
    /// Products keyed by a name local to the file
    pub products: FxHashMap<String, ProductFixture>,
}

/// One product as written in YAML.
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Stock keeping unit
    pub sku: String,

    /// Display name
    pub name: String,

    /// Product category
    #[serde(default)]
    pub category: Option<String>,

    /// Unit price (e.g., "144000 IDR")
    pub price: String,

    /// Strike-through price
    #[serde(default)]
    pub original_price: Option<String>,

    /// Barcode
    #[serde(default)]
    pub barcode: Option<String>,

    /// Tax code
    #[serde(default)]
    pub tax_code: Option<String>,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    /// Whether the product can be sold
    #[serde(default = "active_by_default")]
    pub active: bool,

    /// Bundle code
    #[serde(default)]
    pub bundle_code: Option<String>,

    /// Bundle tiers
    #[serde(default)]
    pub bulk_pricing: Vec<TierFixture>,
}

/// Tier Fixture
#[derive(Debug, Deserialize)]
pub struct TierFixture {
    /// Units covered by the tier
    pub qty: u32,

    /// Price for exactly `qty` units (e.g., "240000 IDR")
    pub total: String,
}

fn active_by_default() -> bool {
    true
}

impl TryFrom<ProductFixture> for Product<'_> {
    type Error = FixtureError;

    fn try_from(fixture: ProductFixture) -> Result<Self, Self::Error> {
        let price = parse_money(&fixture.price)?;

        let original_price = fixture
            .original_price
            .as_deref()
            .map(parse_money)
            .transpose()?;

        let tiers = fixture
            .bulk_pricing
            .iter()
            .map(|tier| parse_money(&tier.total).map(|total| (tier.qty, total)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Product {
            sku: fixture.sku,
            name: fixture.name,
            category: fixture.category,
            price,
            original_price,
            barcode: fixture.barcode,
            tax_code: fixture.tax_code,
            active: fixture.active,
            stock: fixture.stock,
            bundle_code: fixture.bundle_code,
            bulk_pricing: TierSet::from_pairs(tiers)?,
        })
    }
}

/// Parse a price string into [`Money`].
///
/// # Errors
///
/// See [`parse_price`].
pub fn parse_money<'a>(s: &str) -> Result<Money<'a, Currency>, FixtureError> {
    let (minor_units, currency) = parse_price(s)?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Parse `"144000 IDR"` or `"2.99 GBP"` into minor units and a currency.
///
/// The amount is in major units and scaled by the currency's exponent.
///
/// # Errors
///
/// - [`FixtureError::InvalidPrice`]: not two words, not a decimal, or too large.
/// - [`FixtureError::UnknownCurrency`]: the code is not IDR, SGD, USD, EUR or GBP.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let mut words = s.split_whitespace();

    let (Some(amount), Some(code), None) = (words.next(), words.next(), words.next()) else {
        return Err(FixtureError::InvalidPrice(s.to_string()));
    };

    let currency = match code {
        "IDR" => IDR,
        "SGD" => SGD,
        "USD" => USD,
        "EUR" => EUR,
        "GBP" => GBP,
        unknown => return Err(FixtureError::UnknownCurrency(unknown.to_string())),
    };

    let invalid = || FixtureError::InvalidPrice(s.to_string());

    let major = Decimal::from_str_exact(amount).map_err(|_err| invalid())?;
    let scale = 10_i64.checked_pow(currency.exponent).ok_or_else(invalid)?;

    let minor = major
        .checked_mul(Decimal::from(scale))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(invalid)?;

    Ok((minor, currency))
}

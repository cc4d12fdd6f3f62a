//! Fixtures

use std::{fs, path::PathBuf};

use rusty_money::iso::Currency;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    catalog::{Catalog, CatalogError},
    fixtures::{carts::CartFixture, products::ProductsFixture},
    products::Product,
    sales::{NewSale, Operator, SaleLine},
    tiers::TierError,
};

pub mod carts;
pub mod products;

/// Errors raised while loading catalog and cart fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A fixture file could not be read.
    #[error("cannot read fixture: {0}")]
    Io(#[from] std::io::Error),

    /// A fixture file is not valid YAML for its shape.
    #[error("malformed fixture YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A price is not written as `AMOUNT CODE`, or does not fit in minor units.
    #[error("bad price {0:?}")]
    InvalidPrice(String),

    /// A price uses a currency code the loader does not know.
    #[error("unsupported currency {0}")]
    UnknownCurrency(String),

    /// No product in the loaded catalog has this SKU.
    #[error("no product with SKU {0}")]
    ProductNotFound(String),

    /// Products in one set use different currencies (catalog currency, product currency).
    #[error("catalog is priced in {0}, product in {1}")]
    CurrencyMismatch(String, String),

    /// Products must be loaded before the catalog or its currency can be used.
    #[error("no products loaded")]
    NoCurrency,

    /// A checkout was requested before any cart was loaded.
    #[error("no cart loaded")]
    NoCart,

    /// A product's tiers are malformed.
    #[error(transparent)]
    Tier(#[from] TierError),

    /// The catalog refused a product.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A checkout loaded from a cart fixture.
#[derive(Debug, Clone)]
pub struct Checkout<'a> {
    /// Staff member running the checkout
    pub operator: Operator,

    /// Sale to record
    pub sale: NewSale<'a>,
}

/// A catalog and cart read from `<root>/products/<set>.yml` and `<root>/carts/<set>.yml`.
#[derive(Debug)]
pub struct Fixture<'a> {
    root: PathBuf,
    catalog: Option<Catalog<'a>>,
    cart: Option<CartFixture>,
}

impl<'a> Fixture<'a> {
    /// Nothing loaded yet, reading from `./fixtures`.
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Nothing loaded yet, reading from `root`.
    pub fn with_base_path(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog: None,
            cart: None,
        }
    }

    /// Load products from a YAML fixture file into the catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if there are currency
    /// mismatches, or if the catalog rejects a product.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: ProductsFixture = self.read_yaml("products", name)?;

        let mut loaded = Vec::with_capacity(fixture.products.len());

        for product_fixture in fixture.products.into_values() {
            let (_minor_units, currency) = products::parse_price(&product_fixture.price)?;

            loaded.push((currency, Product::try_from(product_fixture)?));
        }

        // Insert in SKU order so keys don't depend on map iteration order.
        loaded.sort_by(|(_, a), (_, b)| a.sku.cmp(&b.sku));

        for (currency, product) in loaded {
            let catalog = self.catalog.get_or_insert_with(|| Catalog::new(currency));

            if catalog.currency() != currency {
                return Err(FixtureError::CurrencyMismatch(
                    catalog.currency().iso_alpha_code.to_string(),
                    currency.iso_alpha_code.to_string(),
                ));
            }

            catalog.insert(product)?;
        }

        Ok(self)
    }

    /// Load a cart from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.cart = Some(self.read_yaml("carts", name)?);

        Ok(self)
    }

    /// Load the products and cart of a set from `./fixtures`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in("./fixtures", name)
    }

    /// Load the products and cart of a set from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be loaded.
    pub fn from_set_in(root: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(root);

        fixture.load_products(name)?.load_cart(name)?;

        Ok(fixture)
    }

    /// Catalog built from the loaded products.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCurrency`] before any products are loaded.
    pub fn catalog(&self) -> Result<&Catalog<'a>, FixtureError> {
        self.catalog.as_ref().ok_or(FixtureError::NoCurrency)
    }

    /// Mutable catalog, for recording sales against.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCurrency`] before any products are loaded.
    pub fn catalog_mut(&mut self) -> Result<&mut Catalog<'a>, FixtureError> {
        self.catalog.as_mut().ok_or(FixtureError::NoCurrency)
    }

    /// Look up a loaded product by SKU.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::ProductNotFound`] for an unknown SKU.
    pub fn product(&self, sku: &str) -> Result<&Product<'a>, FixtureError> {
        self.catalog()?
            .get_by_sku(sku)
            .map_err(|_err| FixtureError::ProductNotFound(sku.to_string()))
    }

    /// Currency of the loaded catalog.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCurrency`] before any products are loaded.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        Ok(self.catalog()?.currency())
    }

    /// Build the checkout described by the loaded cart
    ///
    /// # Errors
    ///
    /// Returns an error if no cart is loaded or its discount cannot be parsed.
    pub fn checkout(&self) -> Result<Checkout<'a>, FixtureError> {
        let cart = self.cart.as_ref().ok_or(FixtureError::NoCart)?;

        let discount = cart
            .discount
            .as_deref()
            .map(products::parse_money)
            .transpose()?;

        let lines = cart
            .lines
            .iter()
            .map(|line| SaleLine::new(line.sku.clone(), line.qty))
            .collect();

        Ok(Checkout {
            operator: cart.operator.clone(),
            sale: NewSale {
                lines,
                discount,
                payment: cart.payment.clone(),
                customer_name: cart.customer_name.clone(),
            },
        })
    }

    fn read_yaml<T: DeserializeOwned>(&self, kind: &str, name: &str) -> Result<T, FixtureError> {
        let path = self.root.join(kind).join(format!("{name}.yml"));

        Ok(serde_norway::from_str(&fs::read_to_string(path)?)?)
    }
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}

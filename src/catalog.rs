//! Catalog
//!
//! In-memory product catalog with a unique SKU index.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::debug;

use crate::{
    paging::Paging,
    products::{Product, ProductKey},
};

/// Errors related to catalog maintenance and stock movements.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Another product already uses this SKU.
    #[error("SKU {0} already exists")]
    DuplicateSku(String),

    /// A product SKU must not be blank.
    #[error("SKU must not be blank")]
    BlankSku,

    /// No product has this key.
    #[error("product not found")]
    ProductNotFound(ProductKey),

    /// No product has this SKU.
    #[error("product {0} not found")]
    SkuNotFound(String),

    /// A price is below zero (SKU, price in minor units).
    #[error("product {0} has negative price {1}")]
    NegativePrice(String, i64),

    /// A product price is in a different currency to the catalog (SKU, product currency, catalog currency).
    #[error("product {0} has currency {1}, but catalog has currency {2}")]
    CurrencyMismatch(String, &'static str, &'static str),

    /// Not enough stock to fulfil a request.
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product SKU
        sku: String,
        /// Units requested
        requested: u32,
        /// Units in stock
        available: u32,
    },
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate<'a> {
    /// New SKU
    pub sku: Option<String>,

    /// New name
    pub name: Option<String>,

    /// New category; `Some(None)` clears it
    pub category: Option<Option<String>>,

    /// New unit price
    pub price: Option<Money<'a, Currency>>,

    /// New barcode; `Some(None)` clears it
    pub barcode: Option<Option<String>>,

    /// New tax code; `Some(None)` clears it
    pub tax_code: Option<Option<String>>,

    /// New stock level
    pub stock: Option<u32>,

    /// New active flag
    pub active: Option<bool>,
}

/// Product search parameters.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Case-insensitive text matched against name, SKU and barcode
    pub text: Option<String>,

    /// Page to return
    pub paging: Paging,
}

/// One page of search results.
#[derive(Debug)]
pub struct ProductPage<'c, 'a> {
    /// Matching products on this page
    pub products: Vec<(ProductKey, &'c Product<'a>)>,

    /// Number of matching products across all pages
    pub total: usize,
}

/// Product Catalog
#[derive(Debug)]
pub struct Catalog<'a> {
    products: SlotMap<ProductKey, Product<'a>>,
    skus: FxHashMap<String, ProductKey>,
    currency: &'static Currency,
}

impl<'a> Catalog<'a> {
    /// Create an empty catalog priced in `currency`.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            products: SlotMap::with_key(),
            skus: FxHashMap::default(),
            currency,
        }
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the SKU is blank or taken, or a price is negative or
    /// in the wrong currency.
    pub fn insert(&mut self, mut product: Product<'a>) -> Result<ProductKey, CatalogError> {
        product.sku = product.sku.trim().to_string();
        product.name = product.name.trim().to_string();

        if product.sku.is_empty() {
            return Err(CatalogError::BlankSku);
        }

        if self.skus.contains_key(&product.sku) {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        self.validate_prices(&product)?;

        let sku = product.sku.clone();
        let key = self.products.insert(product);

        self.skus.insert(sku.clone(), key);

        debug!(sku, "added product to catalog");

        Ok(key)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the product does not exist, or the updated product
    /// fails the same checks as [`insert`](Self::insert). A failed update changes nothing.
    pub fn update(
        &mut self,
        key: ProductKey,
        update: ProductUpdate<'a>,
    ) -> Result<&Product<'a>, CatalogError> {
        let current = self
            .products
            .get(key)
            .ok_or(CatalogError::ProductNotFound(key))?;

        let mut product = current.clone();
        let old_sku = current.sku.clone();

        if let Some(sku) = update.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(barcode) = update.barcode {
            product.barcode = barcode;
        }
        if let Some(tax_code) = update.tax_code {
            product.tax_code = tax_code;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(active) = update.active {
            product.active = active;
        }

        if product.sku.is_empty() {
            return Err(CatalogError::BlankSku);
        }

        if product.sku != old_sku && self.skus.contains_key(&product.sku) {
            return Err(CatalogError::DuplicateSku(product.sku));
        }

        self.validate_prices(&product)?;

        if product.sku != old_sku {
            self.skus.remove(&old_sku);
            self.skus.insert(product.sku.clone(), key);
        }

        debug!(sku = product.sku, "updated product");

        let slot = self
            .products
            .get_mut(key)
            .ok_or(CatalogError::ProductNotFound(key))?;

        *slot = product;

        Ok(slot)
    }

    /// Remove a product, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the product does not exist.
    pub fn remove(&mut self, key: ProductKey) -> Result<Product<'a>, CatalogError> {
        let product = self
            .products
            .remove(key)
            .ok_or(CatalogError::ProductNotFound(key))?;

        self.skus.remove(&product.sku);

        debug!(sku = product.sku, "removed product from catalog");

        Ok(product)
    }

    /// Get a product by key.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the product does not exist.
    pub fn get(&self, key: ProductKey) -> Result<&Product<'a>, CatalogError> {
        self.products
            .get(key)
            .ok_or(CatalogError::ProductNotFound(key))
    }

    /// Get a product key by SKU.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SkuNotFound`] if no product has the SKU.
    pub fn key_for_sku(&self, sku: &str) -> Result<ProductKey, CatalogError> {
        self.skus
            .get(sku.trim())
            .copied()
            .ok_or_else(|| CatalogError::SkuNotFound(sku.to_string()))
    }

    /// Get a product by SKU.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SkuNotFound`] if no product has the SKU.
    pub fn get_by_sku(&self, sku: &str) -> Result<&Product<'a>, CatalogError> {
        let key = self.key_for_sku(sku)?;

        self.products
            .get(key)
            .ok_or_else(|| CatalogError::SkuNotFound(sku.to_string()))
    }

    /// Search active products.
    pub fn search(&self, query: &ProductQuery) -> ProductPage<'_, 'a> {
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);
        let needle = needle.as_deref();

        let matches = || {
            self.products
                .iter()
                .filter(|(_, product)| product.active)
                .filter(move |(_, product)| {
                    needle.is_none_or(|needle| product_matches(product, needle))
                })
        };

        ProductPage {
            total: matches().count(),
            products: query.paging.apply(matches()).collect(),
        }
    }

    /// Remove `quantity` units from a product's stock.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the product does not exist or has too little stock.
    pub fn take_stock(&mut self, key: ProductKey, quantity: u32) -> Result<u32, CatalogError> {
        let product = self
            .products
            .get_mut(key)
            .ok_or(CatalogError::ProductNotFound(key))?;

        product.stock = product.stock.checked_sub(quantity).ok_or_else(|| {
            CatalogError::InsufficientStock {
                sku: product.sku.clone(),
                requested: quantity,
                available: product.stock,
            }
        })?;

        Ok(product.stock)
    }

    /// Iterate over all products, active or not.
    pub fn iter(&self) -> impl Iterator<Item = (ProductKey, &Product<'a>)> {
        self.products.iter()
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// True when the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Catalog currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn validate_prices(&self, product: &Product<'a>) -> Result<(), CatalogError> {
        let prices = std::iter::once(product.price)
            .chain(product.original_price)
            .chain(product.bulk_pricing.iter().map(|tier| tier.total()));

        for price in prices {
            if price.currency() != self.currency {
                return Err(CatalogError::CurrencyMismatch(
                    product.sku.clone(),
                    price.currency().iso_alpha_code,
                    self.currency.iso_alpha_code,
                ));
            }

            if price.to_minor_units() < 0 {
                return Err(CatalogError::NegativePrice(
                    product.sku.clone(),
                    price.to_minor_units(),
                ));
            }
        }

        Ok(())
    }
}

fn product_matches(product: &Product<'_>, needle: &str) -> bool {
    product.name.to_lowercase().contains(needle)
        || product.sku.to_lowercase().contains(needle)
        || product
            .barcode
            .as_deref()
            .is_some_and(|barcode| barcode.to_lowercase().contains(needle))
}

//! Products

use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

use crate::tiers::TierSet;

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Product
#[derive(Debug, Clone)]
pub struct Product<'a> {
    /// Stock keeping unit, unique within a catalog
    pub sku: String,

    /// Display name
    pub name: String,

    /// Product category
    pub category: Option<String>,

    /// Unit selling price
    pub price: Money<'a, Currency>,

    /// Strike-through price shown next to the selling price
    pub original_price: Option<Money<'a, Currency>>,

    /// Barcode
    pub barcode: Option<String>,

    /// Tax code
    pub tax_code: Option<String>,

    /// Inactive products are hidden from search and cannot be sold
    pub active: bool,

    /// Units in stock
    pub stock: u32,

    /// Promotional bundle this product is sold under
    pub bundle_code: Option<String>,

    /// Multi-buy tiers for the bundle
    pub bulk_pricing: TierSet<'a>,
}

impl<'a> Product<'a> {
    /// Create an active product with no stock, bundle or tiers.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money<'a, Currency>,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: None,
            price,
            original_price: None,
            barcode: None,
            tax_code: None,
            active: true,
            stock: 0,
            bundle_code: None,
            bulk_pricing: TierSet::empty(),
        }
    }

    /// Set the stock level.
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Place the product in a bundle with the given tiers.
    #[must_use]
    pub fn with_bundle(mut self, code: impl Into<String>, tiers: TierSet<'a>) -> Self {
        self.bundle_code = Some(code.into());
        self.bulk_pricing = tiers;
        self
    }

    /// Bundle code, ignoring blank codes.
    pub fn bundle(&self) -> Option<&str> {
        self.bundle_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::IDR;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn new_product_defaults() {
        let product = Product::new("T128", "Toner", Money::from_minor(144_000, IDR));

        assert!(product.active);
        assert_eq!(product.stock, 0);
        assert!(product.bundle().is_none());
        assert!(product.bulk_pricing.is_empty());
    }

    #[test]
    fn blank_bundle_code_is_ignored() {
        let product = Product::new("T128", "Toner", Money::from_minor(144_000, IDR))
            .with_bundle("  ", TierSet::empty());

        assert!(product.bundle().is_none());
    }

    #[test]
    fn with_bundle_sets_code_and_tiers() -> TestResult {
        let tiers = TierSet::from_pairs([(2, Money::from_minor(240_000, IDR))])?;

        let product = Product::new("T128", "Toner", Money::from_minor(144_000, IDR))
            .with_stock(5)
            .with_bundle("facial-care", tiers);

        assert_eq!(product.bundle(), Some("facial-care"));
        assert_eq!(product.bulk_pricing.len(), 1);
        assert_eq!(product.stock, 5);

        Ok(())
    }
}

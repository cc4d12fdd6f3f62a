//! Kasir prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    allocation::{Allocation, AllocationError, allocate, allocate_minor},
    bundles::{BundleError, CartLine, LineGroup, PricedLine, group_lines, price_lines},
    catalog::{Catalog, CatalogError, ProductPage, ProductQuery, ProductUpdate},
    fixtures::{Checkout, Fixture, FixtureError},
    paging::Paging,
    pricing::{PricingError, minimum_total, minimum_totals},
    products::{Product, ProductKey},
    receipt::{Receipt, ReceiptError},
    rounding::{RoundingError, round_to_increment},
    sales::{
        InvoiceNumber, NewSale, Operator, Payment, PaymentMethod, Role, Sale, SaleError,
        SaleItem, SaleLine, SalePage, SaleQuery, SaleSettings, SaleStatus, SalesLedger,
        SalesService,
    },
    tiers::{PriceTier, TierError, TierSet},
};

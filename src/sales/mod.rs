//! Sales
//!
//! Recording completed sales against the catalog: invoice numbering, stock movements and
//! the sales ledger.

use jiff::{Timestamp, civil::Date};
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    bundles::BundleError, catalog::CatalogError, products::ProductKey, rounding::RoundingError,
};

pub mod invoice;
pub mod ledger;
pub mod service;

pub use invoice::{InvoiceNumber, LocalStamp};
pub use ledger::{SalePage, SaleQuery, SalesLedger};
pub use service::{NewSale, SaleLine, SaleSettings, SalesService};

/// Errors raised while creating or querying sales.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaleError {
    /// The operator's role may not perform this action.
    #[error("permission denied for role {0}")]
    PermissionDenied(Role),

    /// A sale needs at least one line.
    #[error("cart is empty")]
    EmptyCart,

    /// Line quantities must be at least one (SKU).
    #[error("quantity for {0} must be at least 1")]
    InvalidQuantity(String),

    /// No product has this SKU.
    #[error("product {0} not found")]
    ProductNotFound(String),

    /// Inactive products cannot be sold (SKU).
    #[error("product {0} is not active")]
    ProductInactive(String),

    /// Not enough stock to cover every line for a product.
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product name
        name: String,
        /// Units requested across all lines
        requested: u32,
        /// Units in stock
        available: u32,
    },

    /// Discounts cannot be negative (minor units).
    #[error("discount {0} cannot be negative")]
    NegativeDiscount(i64),

    /// Discounts cannot exceed the subtotal (discount, subtotal in minor units).
    #[error("discount {0} cannot exceed subtotal {1}")]
    DiscountExceedsSubtotal(i64, i64),

    /// An amount is in a different currency to the catalog (amount currency, catalog currency).
    #[error("amount in {0} does not match catalog currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// A quantity or amount does not fit.
    #[error("sale totals overflow")]
    Overflow,

    /// The configured UTC offset is out of range (hours).
    #[error("invalid UTC offset {0}")]
    InvalidUtcOffset(i8),

    /// No sale has this id.
    #[error("sale {0} not found")]
    SaleNotFound(Uuid),

    /// Wrapped line pricing error.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Wrapped catalog error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Wrapped cash rounding error.
    #[error(transparent)]
    Rounding(#[from] RoundingError),
}

/// Staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access
    Admin,

    /// Records sales and sees their own history
    Cashier,

    /// Reads all sales
    Finance,
}

impl Role {
    /// Whether this role may record sales.
    pub fn can_sell(self) -> bool {
        matches!(self, Self::Admin | Self::Cashier)
    }

    /// Whether this role may see sales recorded by other staff.
    pub fn sees_all_sales(self) -> bool {
        matches!(self, Self::Admin | Self::Finance)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Cashier => "cashier",
            Self::Finance => "finance",
        })
    }
}

/// A member of staff acting on the system.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Operator {
    /// Staff id
    pub id: String,

    /// Display name printed on receipts
    pub name: String,

    /// Role
    pub role: Role,
}

impl Operator {
    /// Create an operator.
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

/// Payment method, without its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash
    Cash,

    /// QRIS code scan
    Qris,

    /// Debit card on an EDC terminal
    EdcDebit,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cash => "cash",
            Self::Qris => "qris",
            Self::EdcDebit => "edc_debit",
        })
    }
}

/// Payment details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Payment {
    /// Cash
    Cash,

    /// QRIS code scan
    Qris {
        /// Acquiring bank
        #[serde(default)]
        acquirer: Option<String>,

        /// Retrieval reference number
        #[serde(default)]
        rrn: Option<String>,
    },

    /// Debit card on an EDC terminal
    EdcDebit {
        /// Card issuer
        #[serde(default)]
        issuer: Option<String>,

        /// Terminal approval code
        #[serde(default)]
        approval_code: Option<String>,
    },
}

impl Payment {
    /// Payment method.
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Cash => PaymentMethod::Cash,
            Self::Qris { .. } => PaymentMethod::Qris,
            Self::EdcDebit { .. } => PaymentMethod::EdcDebit,
        }
    }
}

/// Sale status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Paid in full
    Paid,

    /// Cancelled
    Void,

    /// Refunded
    Refund,

    /// Payment failed
    Failed,
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Paid => "PAID",
            Self::Void => "VOID",
            Self::Refund => "REFUND",
            Self::Failed => "FAILED",
        })
    }
}

/// One line of a recorded sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleItem<'a> {
    /// Product sold
    pub product: ProductKey,

    /// SKU at the time of sale
    pub sku: String,

    /// Product name at the time of sale
    pub name: String,

    /// Units sold
    pub quantity: u32,

    /// Unit price at the time of sale
    pub price: Money<'a, Currency>,

    /// Strike-through price at the time of sale
    pub original_price: Option<Money<'a, Currency>>,

    /// Amount charged for the line
    pub line_total: Money<'a, Currency>,

    /// Bundle the line was priced under
    pub bundle_code: Option<String>,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale<'a> {
    /// Sale id
    pub id: Uuid,

    /// Invoice number
    pub invoice: InvoiceNumber,

    /// Local calendar date of the sale
    pub local_date: Date,

    /// Local date, `dd/mm/YYYY`
    pub date: String,

    /// Local time, `HH:MM:SS`
    pub time: String,

    /// Branch the sale was recorded at
    pub branch_id: String,

    /// Staff id of the operator
    pub cashier_id: String,

    /// Name of the operator
    pub cashier_name: String,

    /// Customer name
    pub customer_name: Option<String>,

    /// Sold lines, in cart order
    pub items: Vec<SaleItem<'a>>,

    /// Sum of line totals
    pub subtotal: Money<'a, Currency>,

    /// Discount taken off the subtotal
    pub discount: Money<'a, Currency>,

    /// Tax added to the sale
    pub tax: Money<'a, Currency>,

    /// Amount due after cash rounding
    pub total: Money<'a, Currency>,

    /// Payment details
    pub payment: Payment,

    /// Status
    pub status: SaleStatus,

    /// When the sale was recorded
    pub created_at: Timestamp,
}

impl Sale<'_> {
    /// Invoice number as printed.
    pub fn invoice_no(&self) -> String {
        self.invoice.to_string()
    }

    /// Total units sold.
    pub fn units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_and_cashiers_sell() {
        assert!(Role::Admin.can_sell());
        assert!(Role::Cashier.can_sell());
        assert!(!Role::Finance.can_sell());
    }

    #[test]
    fn cashiers_only_see_their_own_sales() {
        assert!(Role::Admin.sees_all_sales());
        assert!(Role::Finance.sees_all_sales());
        assert!(!Role::Cashier.sees_all_sales());
    }

    #[test]
    fn payment_method_matches_details() {
        let qris = Payment::Qris {
            acquirer: Some("BCA".to_string()),
            rrn: None,
        };

        assert_eq!(qris.method(), PaymentMethod::Qris);
        assert_eq!(Payment::Cash.method(), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::EdcDebit.to_string(), "edc_debit");
    }

    #[test]
    fn payment_deserializes_from_tagged_yaml() -> testresult::TestResult {
        let payment: Payment =
            serde_norway::from_str("method: edc_debit\nissuer: Mandiri\napproval_code: '123456'\n")?;

        assert_eq!(
            payment,
            Payment::EdcDebit {
                issuer: Some("Mandiri".to_string()),
                approval_code: Some("123456".to_string()),
            }
        );

        Ok(())
    }
}

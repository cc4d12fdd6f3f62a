//! Cart Fixtures

use serde::Deserialize;

use crate::sales::{Operator, Payment};

/// A cart waiting to be checked out.
#[derive(Debug, Clone, Deserialize)]
pub struct CartFixture {
    /// Staff member running the checkout
    pub operator: Operator,

    /// Customer name
    #[serde(default)]
    pub customer_name: Option<String>,

    /// Payment details
    pub payment: Payment,

    /// Discount off the subtotal (e.g., "5000 IDR")
    #[serde(default)]
    pub discount: Option<String>,

    /// Scanned lines
    pub lines: Vec<CartLineFixture>,
}

/// Cart Line Fixture
#[derive(Debug, Clone, Deserialize)]
pub struct CartLineFixture {
    /// Product SKU
    pub sku: String,

    /// Units
    pub qty: u32,
}

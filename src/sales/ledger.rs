//! Sales Ledger

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::{
    paging::Paging,
    sales::{Operator, PaymentMethod, Sale, SaleError, SaleStatus},
};

/// Filters for listing sales. Every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct SaleQuery {
    /// First local date to include
    pub date_from: Option<Date>,

    /// Last local date to include
    pub date_to: Option<Date>,

    /// Only sales recorded by this staff id. Ignored for cashiers, who only see their own.
    pub cashier_id: Option<String>,

    /// Only sales paid this way
    pub method: Option<PaymentMethod>,

    /// Only sales with this status
    pub status: Option<SaleStatus>,

    /// Case-insensitive invoice number fragment
    pub invoice: Option<String>,

    /// Page to return
    pub paging: Paging,
}

/// One page of sales, newest first.
#[derive(Debug)]
pub struct SalePage<'l, 'a> {
    /// Sales on this page
    pub sales: Vec<&'l Sale<'a>>,

    /// Number of matching sales across all pages
    pub total: usize,
}

/// Recorded sales.
#[derive(Debug, Default)]
pub struct SalesLedger<'a> {
    sales: Vec<Sale<'a>>,
    by_id: FxHashMap<Uuid, usize>,
    sequences: FxHashMap<String, u32>,
}

impl<'a> SalesLedger<'a> {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next invoice sequence for an invoice prefix.
    pub fn next_sequence(&self, prefix: &str) -> u32 {
        self.sequences
            .get(prefix)
            .copied()
            .unwrap_or_default()
            .saturating_add(1)
    }

    /// Record a sale.
    pub fn record(&mut self, sale: Sale<'a>) {
        let sequence = self
            .sequences
            .entry(sale.invoice.prefix().to_string())
            .or_default();

        *sequence = (*sequence).max(sale.invoice.sequence());

        let idx = self.sales.len();

        self.by_id.insert(sale.id, idx);
        self.sales.push(sale);
    }

    /// Get a sale by id.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::SaleNotFound`] if no sale has this id.
    pub fn get(&self, id: Uuid) -> Result<&Sale<'a>, SaleError> {
        self.by_id
            .get(&id)
            .and_then(|&idx| self.sales.get(idx))
            .ok_or(SaleError::SaleNotFound(id))
    }

    /// List sales visible to `viewer`, newest first.
    ///
    /// Cashiers only ever see sales they recorded.
    pub fn list(&self, viewer: &Operator, query: &SaleQuery) -> SalePage<'_, 'a> {
        let cashier_id = if viewer.role.sees_all_sales() {
            query.cashier_id.as_deref()
        } else {
            Some(viewer.id.as_str())
        };

        let invoice = query
            .invoice
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<&Sale<'a>> = self
            .sales
            .iter()
            .rev()
            .filter(|sale| query.date_from.is_none_or(|from| sale.local_date >= from))
            .filter(|sale| query.date_to.is_none_or(|to| sale.local_date <= to))
            .filter(|sale| cashier_id.is_none_or(|id| sale.cashier_id == id))
            .filter(|sale| query.method.is_none_or(|method| sale.payment.method() == method))
            .filter(|sale| query.status.is_none_or(|status| sale.status == status))
            .filter(|sale| {
                invoice
                    .as_deref()
                    .is_none_or(|needle| sale.invoice_no().to_lowercase().contains(needle))
            })
            .collect();

        // Stable, so sales recorded at the same instant stay newest first.
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        SalePage {
            total: matches.len(),
            sales: query.paging.apply(matches.into_iter()).collect(),
        }
    }

    /// Iterate over sales in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Sale<'a>> {
        self.sales.iter()
    }

    /// Number of recorded sales.
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    /// True when no sales have been recorded.
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}

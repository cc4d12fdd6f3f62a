//! Checkout
//!
//! Turns a cart into a recorded sale. Every check runs before stock or the ledger is
//! touched, so a rejected sale leaves both exactly as they were.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    bundles::{CartLine, price_lines},
    catalog::Catalog,
    products::ProductKey,
    rounding::round_to_increment,
    sales::{
        InvoiceNumber, LocalStamp, Operator, Payment, Sale, SaleError, SaleItem, SaleStatus,
        SalesLedger, invoice,
    },
};

/// Default branch id.
pub const DEFAULT_BRANCH_ID: &str = "JKT-01";

/// Default UTC offset (Jakarta).
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = 7;

/// Checkout settings for a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleSettings {
    /// Branch id, printed on receipts and used in invoice numbers
    pub branch_id: String,

    /// Totals are rounded to a multiple of this amount, which must be in the catalog currency
    pub cash_rounding: Money<'static, Currency>,

    /// Local time offset from UTC, in hours
    pub utc_offset_hours: i8,
}

impl SaleSettings {
    /// Settings for a branch with the given cash rounding increment.
    pub fn new(
        branch_id: impl Into<String>,
        cash_rounding: Money<'static, Currency>,
        utc_offset_hours: i8,
    ) -> Self {
        Self {
            branch_id: branch_id.into(),
            cash_rounding,
            utc_offset_hours,
        }
    }
}

impl Default for SaleSettings {
    /// Jakarta branch, rounding to 100 IDR.
    fn default() -> Self {
        let hundred_rupiah = Money::from_major(100, rusty_money::iso::IDR);

        Self::new(DEFAULT_BRANCH_ID, hundred_rupiah, DEFAULT_UTC_OFFSET_HOURS)
    }
}

/// A requested cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    /// Product SKU
    pub sku: String,

    /// Units requested
    pub quantity: u32,
}

impl SaleLine {
    /// Create a cart line.
    pub fn new(sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// A sale to be recorded.
#[derive(Debug, Clone)]
pub struct NewSale<'a> {
    /// Cart lines, in the order they were scanned
    pub lines: Vec<SaleLine>,

    /// Discount off the subtotal, zero when `None`
    pub discount: Option<Money<'a, Currency>>,

    /// Payment details
    pub payment: Payment,

    /// Customer name
    pub customer_name: Option<String>,
}

impl<'a> NewSale<'a> {
    /// A sale with no discount or customer name.
    pub fn new(lines: Vec<SaleLine>, payment: Payment) -> Self {
        Self {
            lines,
            discount: None,
            payment,
            customer_name: None,
        }
    }

    /// Set the discount.
    #[must_use]
    pub fn with_discount(mut self, discount: Money<'a, Currency>) -> Self {
        self.discount = Some(discount);
        self
    }
}

/// Records sales for one branch.
#[derive(Debug, Default)]
pub struct SalesService<'a> {
    settings: SaleSettings,
    ledger: SalesLedger<'a>,
}

impl<'a> SalesService<'a> {
    /// Create a service with an empty ledger.
    pub fn new(settings: SaleSettings) -> Self {
        Self {
            settings,
            ledger: SalesLedger::new(),
        }
    }

    /// Branch settings.
    pub fn settings(&self) -> &SaleSettings {
        &self.settings
    }

    /// Recorded sales.
    pub fn ledger(&self) -> &SalesLedger<'a> {
        &self.ledger
    }

    /// Price a cart, take the stock and record the sale.
    ///
    /// # Errors
    ///
    /// Returns a [`SaleError`] if the operator may not sell, the cart is empty or has a
    /// zero quantity, a product is unknown or inactive, stock is short, the discount is
    /// negative or larger than the subtotal, or a total overflows. Nothing is changed
    /// when an error is returned.
    pub fn create_sale(
        &mut self,
        catalog: &mut Catalog<'a>,
        operator: &Operator,
        sale: NewSale<'a>,
        now: Timestamp,
    ) -> Result<&Sale<'a>, SaleError> {
        if !operator.role.can_sell() {
            return Err(SaleError::PermissionDenied(operator.role));
        }

        if sale.lines.is_empty() {
            return Err(SaleError::EmptyCart);
        }

        if let Some(line) = sale.lines.iter().find(|line| line.quantity == 0) {
            return Err(SaleError::InvalidQuantity(line.sku.clone()));
        }

        let currency = catalog.currency();
        let rounding = self.settings.cash_rounding;

        if rounding.currency() != currency {
            return Err(SaleError::CurrencyMismatch(
                rounding.currency().iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }

        let keys = resolve_lines(catalog, &sale.lines)?;

        check_stock(catalog, &keys, &sale.lines)?;

        let items = price_items(catalog, &keys, &sale.lines)?;

        let subtotal = items.iter().try_fold(0i64, |acc, item| {
            acc.checked_add(item.line_total.to_minor_units())
                .ok_or(SaleError::Overflow)
        })?;

        let discount = checked_discount(sale.discount, subtotal, currency)?;
        let tax = 0;

        let due = subtotal
            .checked_sub(discount)
            .and_then(|amount| amount.checked_add(tax))
            .ok_or(SaleError::Overflow)?;

        let total = round_to_increment(Money::from_minor(due, currency), rounding.to_minor_units())?;

        let stamp = LocalStamp::at(now, self.settings.utc_offset_hours)?;
        let prefix = invoice::prefix(&self.settings.branch_id, &stamp);
        let invoice_no = InvoiceNumber::new(
            &self.settings.branch_id,
            &stamp,
            self.ledger.next_sequence(&prefix),
        );

        for (key, quantity) in aggregate_quantities(&keys, &sale.lines)? {
            let remaining = catalog.take_stock(key, quantity)?;

            debug!(?key, quantity, remaining, "took stock");
        }

        let id = Uuid::now_v7();

        info!(
            invoice_no = %invoice_no,
            cashier_id = %operator.id,
            total = total.to_minor_units(),
            method = %sale.payment.method(),
            "recorded sale"
        );

        self.ledger.record(Sale {
            id,
            invoice: invoice_no,
            local_date: stamp.date,
            date: stamp.date_text,
            time: stamp.time_text,
            branch_id: self.settings.branch_id.clone(),
            cashier_id: operator.id.clone(),
            cashier_name: operator.name.clone(),
            customer_name: sale.customer_name,
            items,
            subtotal: Money::from_minor(subtotal, currency),
            discount: Money::from_minor(discount, currency),
            tax: Money::from_minor(tax, currency),
            total,
            payment: sale.payment,
            status: SaleStatus::Paid,
            created_at: now,
        });

        self.ledger.get(id)
    }

    /// Look up a recorded sale.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::SaleNotFound`] if no sale has this id.
    pub fn sale(&self, id: Uuid) -> Result<&Sale<'a>, SaleError> {
        self.ledger.get(id)
    }
}

fn resolve_lines(
    catalog: &Catalog<'_>,
    lines: &[SaleLine],
) -> Result<SmallVec<[ProductKey; 10]>, SaleError> {
    lines
        .iter()
        .map(|line| {
            let key = catalog
                .key_for_sku(&line.sku)
                .map_err(|_err| SaleError::ProductNotFound(line.sku.clone()))?;

            let product = catalog.get(key)?;

            if !product.active {
                return Err(SaleError::ProductInactive(product.sku.clone()));
            }

            Ok(key)
        })
        .collect()
}

/// Total units requested per product, in order of first appearance.
fn aggregate_quantities(
    keys: &[ProductKey],
    lines: &[SaleLine],
) -> Result<SmallVec<[(ProductKey, u32); 10]>, SaleError> {
    let mut totals: SmallVec<[(ProductKey, u32); 10]> = SmallVec::new();
    let mut positions: FxHashMap<ProductKey, usize> = FxHashMap::default();

    for (&key, line) in keys.iter().zip(lines) {
        match positions.get(&key).copied() {
            Some(pos) => {
                if let Some((_, quantity)) = totals.get_mut(pos) {
                    *quantity = quantity
                        .checked_add(line.quantity)
                        .ok_or(SaleError::Overflow)?;
                }
            }
            None => {
                positions.insert(key, totals.len());
                totals.push((key, line.quantity));
            }
        }
    }

    Ok(totals)
}

fn check_stock(
    catalog: &Catalog<'_>,
    keys: &[ProductKey],
    lines: &[SaleLine],
) -> Result<(), SaleError> {
    for (key, requested) in aggregate_quantities(keys, lines)? {
        let product = catalog.get(key)?;

        if product.stock < requested {
            return Err(SaleError::InsufficientStock {
                name: product.name.clone(),
                requested,
                available: product.stock,
            });
        }
    }

    Ok(())
}

fn price_items<'a>(
    catalog: &Catalog<'a>,
    keys: &[ProductKey],
    lines: &[SaleLine],
) -> Result<Vec<SaleItem<'a>>, SaleError> {
    let cart = keys
        .iter()
        .zip(lines)
        .map(|(&key, line)| {
            catalog
                .get(key)
                .map(|product| CartLine::new(product, line.quantity))
        })
        .collect::<Result<SmallVec<[CartLine<'_, 'a>; 10]>, _>>()?;

    let priced = price_lines(&cart)?;

    Ok(keys
        .iter()
        .zip(cart.iter())
        .zip(priced)
        .map(|((&key, line), priced)| SaleItem {
            product: key,
            sku: line.product.sku.clone(),
            name: line.product.name.clone(),
            quantity: line.quantity,
            price: line.product.price,
            original_price: line.product.original_price,
            line_total: priced.line_total,
            bundle_code: priced.bundle,
        })
        .collect())
}

fn checked_discount(
    discount: Option<Money<'_, Currency>>,
    subtotal: i64,
    currency: &'static Currency,
) -> Result<i64, SaleError> {
    let Some(discount) = discount else {
        return Ok(0);
    };

    if discount.currency() != currency {
        return Err(SaleError::CurrencyMismatch(
            discount.currency().iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    let amount = discount.to_minor_units();

    if amount < 0 {
        return Err(SaleError::NegativeDiscount(amount));
    }

    if amount > subtotal {
        return Err(SaleError::DiscountExceedsSubtotal(amount, subtotal));
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{IDR, USD};
    use testresult::TestResult;

    use crate::{
        products::Product,
        sales::{PaymentMethod, Role},
        tiers::TierSet,
    };

    use super::*;

    fn idr<'a>(minor: i64) -> Money<'a, Currency> {
        Money::from_minor(minor, IDR)
    }

    fn catalog<'a>() -> TestResult<Catalog<'a>> {
        let tiers = TierSet::from_pairs([
            (1, idr(125_000)),
            (2, idr(240_000)),
            (3, idr(330_000)),
            (4, idr(420_000)),
            (5, idr(500_000)),
        ])?;

        let mut catalog = Catalog::new(IDR);

        catalog.insert(
            Product::new("T128", "Toner", idr(160_000))
                .with_stock(20)
                .with_bundle("facial-care", tiers.clone()),
        )?;
        catalog.insert(
            Product::new("CF311", "Cream", idr(160_000))
                .with_stock(20)
                .with_bundle("facial-care", tiers),
        )?;
        catalog.insert(Product::new("S1", "Soap", idr(20_050)).with_stock(2))?;

        Ok(catalog)
    }

    fn cashier() -> Operator {
        Operator::new("c1", "Sari", Role::Cashier)
    }

    fn settings() -> SaleSettings {
        SaleSettings::new("JKT-01", Money::from_minor(100, IDR), 7)
    }

    fn now() -> TestResult<Timestamp> {
        Ok("2024-10-15T05:30:00Z".parse()?)
    }

    #[test]
    fn records_bundle_sale() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let sale = service.create_sale(
            &mut catalog,
            &cashier(),
            NewSale::new(
                vec![SaleLine::new("T128", 3), SaleLine::new("CF311", 4)],
                Payment::Cash,
            ),
            now()?,
        )?;

        assert_eq!(sale.subtotal, idr(740_000));
        assert_eq!(sale.total, idr(740_000));
        assert_eq!(sale.invoice_no(), "JKT-01-202410-000001");
        assert_eq!(sale.date, "15/10/2024");
        assert_eq!(sale.time, "12:30:00");
        assert_eq!(sale.status, SaleStatus::Paid);
        assert!(
            sale.items
                .iter()
                .all(|item| item.bundle_code.as_deref() == Some("facial-care"))
        );

        assert_eq!(catalog.get_by_sku("T128")?.stock, 17);
        assert_eq!(catalog.get_by_sku("CF311")?.stock, 16);

        Ok(())
    }

    #[test]
    fn rounds_total_and_applies_discount() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        // 2 x 20,050 = 40,100, less 1,050 = 39,050, rounded half up to 39,100.
        let sale = service.create_sale(
            &mut catalog,
            &cashier(),
            NewSale::new(vec![SaleLine::new("S1", 2)], Payment::Cash).with_discount(idr(1_050)),
            now()?,
        )?;

        assert_eq!(sale.subtotal, idr(40_100));
        assert_eq!(sale.discount, idr(1_050));
        assert_eq!(sale.tax, idr(0));
        assert_eq!(sale.total, idr(39_100));

        Ok(())
    }

    #[test]
    fn invoices_are_sequential() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        for _ in 0..3 {
            service.create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(vec![SaleLine::new("T128", 1)], Payment::Cash),
                now()?,
            )?;
        }

        let invoices: Vec<String> = service.ledger().iter().map(Sale::invoice_no).collect();

        assert_eq!(
            invoices,
            vec![
                "JKT-01-202410-000001",
                "JKT-01-202410-000002",
                "JKT-01-202410-000003"
            ]
        );

        Ok(())
    }

    #[test]
    fn finance_cannot_sell() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let result = service
            .create_sale(
                &mut catalog,
                &Operator::new("f1", "Budi", Role::Finance),
                NewSale::new(vec![SaleLine::new("T128", 1)], Payment::Cash),
                now()?,
            )
            .err();

        assert_eq!(result, Some(SaleError::PermissionDenied(Role::Finance)));

        Ok(())
    }

    #[test]
    fn rejects_empty_cart_and_zero_quantity() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let empty = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(Vec::new(), Payment::Cash),
                now()?,
            )
            .err();
        let zero = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(vec![SaleLine::new("T128", 0)], Payment::Cash),
                now()?,
            )
            .err();

        assert_eq!(empty, Some(SaleError::EmptyCart));
        assert_eq!(zero, Some(SaleError::InvalidQuantity("T128".to_string())));

        Ok(())
    }

    #[test]
    fn stock_is_checked_across_lines() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let result = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(
                    vec![
                        SaleLine::new("S1", 1),
                        SaleLine::new("T128", 1),
                        SaleLine::new("S1", 2),
                    ],
                    Payment::Cash,
                ),
                now()?,
            )
            .err();

        assert_eq!(
            result,
            Some(SaleError::InsufficientStock {
                name: "Soap".to_string(),
                requested: 3,
                available: 2,
            })
        );
        assert_eq!(catalog.get_by_sku("S1")?.stock, 2);
        assert_eq!(catalog.get_by_sku("T128")?.stock, 20);
        assert!(service.ledger().is_empty());

        Ok(())
    }

    #[test]
    fn rejects_unknown_and_inactive_products() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let key = catalog.key_for_sku("S1")?;
        catalog.update(
            key,
            crate::catalog::ProductUpdate {
                active: Some(false),
                ..Default::default()
            },
        )?;

        let unknown = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(vec![SaleLine::new("NOPE", 1)], Payment::Cash),
                now()?,
            )
            .err();
        let inactive = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(vec![SaleLine::new("S1", 1)], Payment::Cash),
                now()?,
            )
            .err();

        assert_eq!(unknown, Some(SaleError::ProductNotFound("NOPE".to_string())));
        assert_eq!(inactive, Some(SaleError::ProductInactive("S1".to_string())));

        Ok(())
    }

    #[test]
    fn rejects_bad_discounts() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());
        let lines = vec![SaleLine::new("S1", 1)];

        let negative = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(lines.clone(), Payment::Cash).with_discount(idr(-1)),
                now()?,
            )
            .err();
        let too_large = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(lines.clone(), Payment::Cash).with_discount(idr(20_051)),
                now()?,
            )
            .err();
        let foreign = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(lines, Payment::Cash).with_discount(Money::from_minor(1, USD)),
                now()?,
            )
            .err();

        assert_eq!(negative, Some(SaleError::NegativeDiscount(-1)));
        assert_eq!(
            too_large,
            Some(SaleError::DiscountExceedsSubtotal(20_051, 20_050))
        );
        assert_eq!(
            foreign,
            Some(SaleError::CurrencyMismatch(
                USD.iso_alpha_code,
                IDR.iso_alpha_code
            ))
        );
        assert_eq!(catalog.get_by_sku("S1")?.stock, 2);

        Ok(())
    }

    #[test]
    fn rounding_in_another_currency_is_rejected() -> TestResult {
        let mut catalog = catalog()?;
        let mut service =
            SalesService::new(SaleSettings::new("JKT-01", Money::from_major(100, USD), 7));

        let result = service
            .create_sale(
                &mut catalog,
                &cashier(),
                NewSale::new(vec![SaleLine::new("S1", 1)], Payment::Cash),
                now()?,
            )
            .err();

        assert_eq!(
            result,
            Some(SaleError::CurrencyMismatch(
                USD.iso_alpha_code,
                IDR.iso_alpha_code
            ))
        );
        assert!(service.ledger().is_empty());
        assert_eq!(catalog.get_by_sku("S1")?.stock, 2);

        Ok(())
    }

    #[test]
    fn full_discount_is_allowed() -> TestResult {
        let mut catalog = catalog()?;
        let mut service = SalesService::new(settings());

        let sale = service.create_sale(
            &mut catalog,
            &cashier(),
            NewSale::new(
                vec![SaleLine::new("S1", 1)],
                Payment::EdcDebit {
                    issuer: Some("Mandiri".to_string()),
                    approval_code: None,
                },
            )
            .with_discount(idr(20_050)),
            now()?,
        )?;

        assert_eq!(sale.total, idr(0));
        assert_eq!(sale.payment.method(), PaymentMethod::EdcDebit);

        Ok(())
    }
}

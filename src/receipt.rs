//! Receipt

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::FromPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::sales::{Payment, Sale, SaleItem};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// A list price does not fit in minor units (line index).
    #[error("list price for line {0} overflows")]
    Overflow(usize),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable view of a recorded sale.
#[derive(Debug, Clone, Copy)]
pub struct Receipt<'s, 'a> {
    sale: &'s Sale<'a>,
}

impl<'s, 'a> Receipt<'s, 'a> {
    /// Create a receipt for a sale.
    pub fn new(sale: &'s Sale<'a>) -> Self {
        Self { sale }
    }

    /// Sale being printed.
    pub fn sale(&self) -> &'s Sale<'a> {
        self.sale
    }

    /// What the items would have cost at their unit prices.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if a line's list price overflows.
    pub fn list_total(&self) -> Result<Money<'a, Currency>, ReceiptError> {
        let mut total: i64 = 0;

        for (idx, item) in self.sale.items.iter().enumerate() {
            total = list_price(item)
                .and_then(|line| total.checked_add(line))
                .ok_or(ReceiptError::Overflow(idx))?;
        }

        Ok(Money::from_minor(total, self.sale.subtotal.currency()))
    }

    /// Amount saved through bundle pricing and the sale discount.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if the list total overflows or a subtraction fails.
    pub fn savings(&self) -> Result<Money<'a, Currency>, ReceiptError> {
        let paid = self.sale.subtotal.sub(self.sale.discount)?;

        Ok(self.list_total()?.sub(paid)?)
    }

    /// Savings as a fraction of the list total.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if the savings cannot be calculated.
    pub fn savings_percent(&self) -> Result<Percentage, ReceiptError> {
        let list_minor = self.list_total()?.to_minor_units();

        if list_minor == 0 {
            return Ok(Percentage::from(0.0));
        }

        let savings_dec = Decimal::from_i64(self.savings()?.to_minor_units()).unwrap_or(Decimal::ZERO);
        let list_dec = Decimal::from_i64(list_minor).unwrap_or(Decimal::ZERO);

        Ok(Percentage::from(savings_dec / list_dec))
    }

    /// Writes the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        write_receipt_header(&mut out, self.sale)?;

        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Unit Price", "Line Total", "Bundle"]);

        let mut color_ops: SmallVec<[(usize, usize, Color); 32]> = SmallVec::new();

        for (idx, item) in self.sale.items.iter().enumerate() {
            let row = idx + 1;

            builder.push_record([
                format!("#{:<3}", idx + 1),
                item.name.clone(),
                item.quantity.to_string(),
                format!("{}", item.price),
                format!("{}", item.line_total),
                item.bundle_code.clone().unwrap_or_default(),
            ]);

            color_ops.push((row, 3, color_dark_grey()));
            color_ops.push((row, 5, color_dark_grey()));

            if list_price(item).is_some_and(|list| item.line_total.to_minor_units() < list) {
                color_ops.push((row, 4, Color::FG_GREEN));
            }
        }

        write_receipt_table(&mut out, builder, color_ops)?;

        write_receipt_summary(&mut out, self)
    }
}

fn list_price(item: &SaleItem<'_>) -> Option<i64> {
    item.price
        .to_minor_units()
        .checked_mul(i64::from(item.quantity))
}

fn write_receipt_header(out: &mut impl io::Write, sale: &Sale<'_>) -> Result<(), ReceiptError> {
    writeln!(out, "\n \x1b[1m{}\x1b[0m", sale.invoice).map_err(|_err| ReceiptError::IO)?;
    writeln!(out, " {} {}  {}", sale.date, sale.time, sale.branch_id)
        .map_err(|_err| ReceiptError::IO)?;
    writeln!(out, " Cashier: {}", sale.cashier_name).map_err(|_err| ReceiptError::IO)?;

    if let Some(customer) = &sale.customer_name {
        writeln!(out, " Customer: {customer}").map_err(|_err| ReceiptError::IO)?;
    }

    writeln!(out, " Payment: {}", payment_display(&sale.payment)).map_err(|_err| ReceiptError::IO)
}

fn payment_display(payment: &Payment) -> String {
    let details = match payment {
        Payment::Cash => None,
        Payment::Qris { acquirer, rrn } => acquirer.as_deref().or(rrn.as_deref()),
        Payment::EdcDebit { issuer, .. } => issuer.as_deref(),
    };

    match details {
        Some(details) => format!("{} ({details})", payment.method()),
        None => payment.method().to_string(),
    }
}

fn write_receipt_table(
    out: &mut impl io::Write,
    builder: Builder,
    color_ops: SmallVec<[(usize, usize, Color); 32]>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt<'_, '_>,
) -> Result<(), ReceiptError> {
    let sale = receipt.sale();
    let savings = receipt.savings()?;
    let savings_percent_points = percent_points_from_fractional_percentage(receipt.savings_percent()?);

    let lines = [
        (" Subtotal:".to_string(), format!("{}  ", sale.subtotal)),
        (" Discount:".to_string(), format!("-{}  ", sale.discount)),
        (" Tax:".to_string(), format!("{}  ", sale.tax)),
        (
            " \x1b[1mTotal:\x1b[0m".to_string(),
            format!("\x1b[1m{}  \x1b[0m", sale.total),
        ),
        (
            " Savings:".to_string(),
            format!("({savings_percent_points:.2}%) {savings}  "),
        ),
    ];

    let label_width = lines
        .iter()
        .map(|(label, _)| visible_width(label))
        .max()
        .unwrap_or_default();

    let value_width = lines
        .iter()
        .map(|(_, value)| visible_width(value))
        .max()
        .unwrap_or_default();

    for (label, value) in &lines {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

/// Converts a fractional percentage to percent points for display.
fn percent_points_from_fractional_percentage(percentage: Percentage) -> Decimal {
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Paints box-drawing characters (U+2500..U+257F) dark grey, one escape per run.
fn colorize_borders(table: &str) -> String {
    const GREY: &str = "\x1b[90m";
    const RESET: &str = "\x1b[0m";

    let is_border = |ch: char| ('\u{2500}'..='\u{257F}').contains(&ch);
    let mut out = String::with_capacity(table.len() + 256);
    let mut previous = false;

    for ch in table.chars() {
        let border = is_border(ch);

        match (previous, border) {
            (false, true) => out.push_str(GREY),
            (true, false) => out.push_str(RESET),
            _ => {}
        }

        out.push(ch);
        previous = border;
    }

    if previous {
        out.push_str(RESET);
    }

    out
}

/// Printed width of `s`, skipping ANSI escape sequences.
fn visible_width(s: &str) -> usize {
    s.split('\x1b')
        .enumerate()
        .map(|(idx, chunk)| {
            if idx == 0 {
                return chunk.chars().count();
            }

            // An escape runs up to and including its first letter.
            chunk
                .chars()
                .skip_while(|ch| !ch.is_ascii_alphabetic())
                .skip(1)
                .count()
        })
        .sum()
}

fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}

//! Kasir CLI

use std::{
    io::{self, Write},
    path::Path,
    process::ExitCode,
};

use anyhow::{Context, Result};
use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::Money;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use kasir::{
    config::{CheckoutConfig, Command, KasirConfig, LogFormat, LoggingConfig},
    fixtures::Fixture,
    pricing::minimum_totals,
    receipt::Receipt,
    sales::SalesService,
};

fn main() -> ExitCode {
    let config = match KasirConfig::load() {
        Ok(config) => config,
        Err(err) => {
            _ = err.print();

            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = init_logging(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialise, must use eprintln"
        )]
        {
            eprintln!("Logging error: {err}");
        }

        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");

            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_writer(io::stderr),
            )
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(io::stderr),
            )
            .with(filter)
            .try_init(),
    }
}

fn run(config: KasirConfig) -> Result<()> {
    match config.command {
        Command::Quote { set } => quote(&config.fixtures, &set, &config.checkout),
        Command::Ladder { set, sku, max } => ladder(&config.fixtures, &set, &sku, max),
    }
}

fn quote(fixtures: &Path, set: &str, checkout_config: &CheckoutConfig) -> Result<()> {
    let mut fixture = Fixture::from_set_in(fixtures, set)
        .with_context(|| format!("failed to load fixture set {set}"))?;

    let checkout = fixture.checkout()?;
    let mut service = SalesService::new(checkout_config.settings()?);

    info!(set, lines = checkout.sale.lines.len(), "checking out fixture cart");

    let sale = service.create_sale(
        fixture.catalog_mut()?,
        &checkout.operator,
        checkout.sale,
        Timestamp::now(),
    )?;

    Receipt::new(sale).write_to(io::stdout().lock())?;

    Ok(())
}

fn ladder(fixtures: &Path, set: &str, sku: &str, max: u32) -> Result<()> {
    let mut fixture = Fixture::with_base_path(fixtures);

    fixture
        .load_products(set)
        .with_context(|| format!("failed to load products for {set}"))?;

    let product = fixture.product(sku)?;
    let currency = product.price.currency();
    let totals = minimum_totals(max, &product.bulk_pricing, product.price)?;

    let mut builder = Builder::default();

    builder.push_record(["Qty", "Total", "Per Unit", "Saving"]);

    for (qty, total) in (1..=max).zip(totals.iter().skip(1)) {
        let list = i64::from(qty).saturating_mul(product.price.to_minor_units());
        let per_unit = (Decimal::from(total.to_minor_units()) / Decimal::from(qty))
            .round_dp(0)
            .to_i64()
            .unwrap_or_default();

        builder.push_record([
            qty.to_string(),
            format!("{total}"),
            format!("{}", Money::from_minor(per_unit, currency)),
            format!(
                "{}",
                Money::from_minor(list.saturating_sub(total.to_minor_units()), currency)
            ),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(1..4), Alignment::right());

    let mut out = io::stdout().lock();

    writeln!(out, "\n {} ({})", product.name, product.sku)?;
    writeln!(out, "{table}")?;

    Ok(())
}

//! Configuration
//!
//! Command line arguments with environment fallbacks. A `.env` file in the working
//! directory is loaded first when present.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rusty_money::Money;

use crate::{
    fixtures::{FixtureError, products::parse_price},
    sales::service::{DEFAULT_BRANCH_ID, DEFAULT_UTC_OFFSET_HOURS, SaleSettings},
};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}

/// Checkout settings.
#[derive(Debug, Args)]
pub struct CheckoutConfig {
    /// Branch id used in invoice numbers
    #[arg(long, env = "KASIR_BRANCH_ID", default_value = DEFAULT_BRANCH_ID, global = true)]
    pub branch_id: String,

    /// Cash rounding increment (e.g. "100 IDR")
    #[arg(long, env = "KASIR_CASH_ROUNDING", default_value = "100 IDR", global = true)]
    pub cash_rounding: String,

    /// Local time offset from UTC, in hours
    #[arg(
        long,
        env = "KASIR_UTC_OFFSET",
        default_value_t = DEFAULT_UTC_OFFSET_HOURS,
        allow_negative_numbers = true,
        global = true
    )]
    pub utc_offset: i8,
}

impl CheckoutConfig {
    /// Build sale settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the cash rounding increment is not a positive price. Its
    /// currency is kept and checked against the catalog at checkout.
    pub fn settings(&self) -> Result<SaleSettings, FixtureError> {
        let (minor, currency) = parse_price(&self.cash_rounding)?;

        if minor <= 0 {
            return Err(FixtureError::InvalidPrice(self.cash_rounding.clone()));
        }

        Ok(SaleSettings::new(
            self.branch_id.clone(),
            Money::from_minor(minor, currency),
            self.utc_offset,
        ))
    }
}

/// Kasir command line
#[derive(Debug, Parser)]
#[command(name = "kasir", about = "Point-of-sale bundle pricing", long_about = None, version)]
pub struct KasirConfig {
    /// Directory holding `products/` and `carts/` fixtures
    #[arg(long, env = "KASIR_FIXTURES", default_value = "./fixtures", global = true)]
    pub fixtures: PathBuf,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Checkout settings
    #[command(flatten)]
    pub checkout: CheckoutConfig,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check out a fixture cart and print the receipt
    Quote {
        /// Fixture set name
        #[arg(long, default_value = "skincare")]
        set: String,
    },

    /// Print the cheapest total for each quantity of one product
    Ladder {
        /// Fixture set name
        #[arg(long, default_value = "skincare")]
        set: String,

        /// Product SKU
        #[arg(long)]
        sku: String,

        /// Largest quantity to price
        #[arg(long, default_value_t = 10)]
        max: u32,
    },
}

impl KasirConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

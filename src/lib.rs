//! Kasir
//!
//! Kasir is a point-of-sale pricing core. It finds the cheapest combination of multi-buy
//! tiers for promotional bundles, splits bundle totals back across cart lines without
//! rounding drift, and records sales against an in-memory catalog.

pub mod allocation;
pub mod bundles;
pub mod catalog;
pub mod config;
pub mod fixtures;
pub mod paging;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod rounding;
pub mod sales;
pub mod tiers;

#![doc(test(attr(deny(warnings))))]

//! Billing Core keeps the product catalog of a small billing tool: stock
//! ledger counters, derived wholesale and retail rates, and price changes
//! scheduled for a future date.

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Billing Core tracing initialized.");
    });
}

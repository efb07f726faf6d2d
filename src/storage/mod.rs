//! Flat-file persistence for the catalog, pending rate changes and bill numbers.

pub mod catalog;
pub mod counter;
pub mod records;
pub mod schedule;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{errors::LedgerError, ledger::Product};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Abstraction over the durable mirror of the product catalog.
pub trait ProductStore: Send + Sync {
    /// Reads every recoverable product row. A missing store yields an empty
    /// list; missing dates are filled with `today`.
    fn load(&self, today: NaiveDate) -> Result<Vec<Product>>;

    /// Writes a full snapshot. Returns `false` when nothing was written.
    fn save(&self, products: &[Product]) -> bool;
}

/// Metadata about a timestamped catalog backup.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
}

pub use catalog::{CsvCatalogStore, CATALOG_HEADER};
pub use counter::BillCounter;
pub use records::{PurchaseItemRecord, PurchaseRecord, RecordStore, SalesReceiptRecord};
pub use schedule::{RateScheduleStore, SweepReport, SCHEDULE_HEADER};

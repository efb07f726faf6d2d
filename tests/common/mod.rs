#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use billing_core::{
    core::{CatalogManager, FixedClock},
    ledger::{ProductEntry, RateEdit},
    storage::{CsvCatalogStore, RateScheduleStore},
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory that outlives the calling test.
pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub struct TestEnv {
    pub dir: PathBuf,
    pub clock: FixedClock,
    pub catalog: CsvCatalogStore,
    pub schedule: RateScheduleStore,
}

impl TestEnv {
    pub fn new(today: NaiveDate) -> Self {
        let dir = temp_dir();
        Self {
            clock: FixedClock::new(today),
            catalog: CsvCatalogStore::new(dir.join("products.csv")),
            schedule: RateScheduleStore::new(dir.join("future_rate_changes.csv")),
            dir,
        }
    }

    /// Opens a manager over this environment's files, as a new session would.
    pub fn open(&self) -> CatalogManager {
        CatalogManager::open(
            Box::new(self.catalog.clone()),
            self.schedule.clone(),
            Box::new(self.clock.clone()),
        )
        .expect("open catalog manager")
        .0
    }
}

pub fn entry(brand: &str, name: &str, opening: i64, purchased: i64) -> ProductEntry {
    ProductEntry {
        brand: brand.into(),
        product_name: name.into(),
        purchase_date: date(2024, 1, 1),
        purchase_rate: 100.0,
        margin1: 10.0,
        manual_wholesale: 0.0,
        margin2: 20.0,
        manual_retail: 0.0,
        opening_stock: opening,
        purchased_stock: purchased,
    }
}

pub fn rate_edit(name: &str, rate: f64, effective: NaiveDate) -> RateEdit {
    RateEdit {
        product_name: name.into(),
        new_purchase_rate: rate,
        effective_date: effective,
        margin1: 10.0,
        manual_wholesale: 0.0,
        margin2: 20.0,
        manual_retail: 0.0,
    }
}

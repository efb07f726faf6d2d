use chrono::NaiveDate;
use csv::StringRecord;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{
    errors::LedgerError,
    ledger::{partition_due, round2, FutureRateChange, Product},
    utils::paths::{ensure_dir, tmp_path},
};

use super::{
    catalog::{Columns, DATE_FORMAT},
    ProductStore, Result,
};

pub const SCHEDULE_HEADER: [&str; 8] = [
    "Product Name",
    "New Purchase Rate",
    "Effective Date",
    "Margin1 (%)",
    "Wholesale Rate",
    "Margin2 (%)",
    "Retail Rate",
    "Modified Date",
];

/// Outcome of one sweep over the pending rate changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Names of the products that received a due change.
    pub applied: Vec<String>,
    /// Due changes whose product no longer exists; they are discarded.
    pub orphaned: Vec<String>,
    /// Changes still waiting for their effective date.
    pub remaining: usize,
}

impl SweepReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.orphaned.is_empty()
    }
}

/// CSV file of future rate changes, at most one per product name.
#[derive(Debug, Clone)]
pub struct RateScheduleStore {
    path: PathBuf,
}

impl RateScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pending changes in file order. Missing, empty or headerless files mean
    /// nothing is pending.
    pub fn load_pending(&self) -> Result<Vec<FutureRateChange>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let columns = match reader.headers() {
            Ok(headers) => Columns::new(headers),
            Err(err) => {
                warn!(error = %err, "unreadable rate schedule header");
                return Ok(Vec::new());
            }
        };
        if !columns.contains("Product Name") || !columns.contains("Effective Date") {
            warn!(path = %self.path.display(), "rate schedule has no usable header");
            return Ok(Vec::new());
        }

        let mut pending = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let row = index + 2;
            let parsed = result
                .map_err(|err| err.to_string())
                .and_then(|record| parse_change(&columns, &record));
            match parsed {
                Ok(change) => pending.push(change),
                Err(reason) => warn!(row, %reason, "skipping rate schedule row"),
            }
        }
        Ok(pending)
    }

    /// Replaces any pending change for the same product and rewrites the file.
    pub fn schedule(&self, change: FutureRateChange) -> Result<()> {
        let mut pending = self.load_pending()?;
        pending.retain(|existing| !existing.applies_to(&change.product_name));
        info!(
            product = %change.product_name,
            effective = %change.effective_date,
            "scheduled rate change"
        );
        pending.push(change);
        self.write_all(&pending)
    }

    /// Applies every change due on `today` to `products`, persists the catalog
    /// through `catalog` when anything was applied, and rewrites the pending
    /// file with what is left (removing it when nothing is left).
    ///
    /// If the catalog save fails the pending file is left untouched so the
    /// same changes are retried on the next sweep.
    pub fn sweep(
        &self,
        today: NaiveDate,
        products: &mut [Product],
        catalog: &dyn ProductStore,
    ) -> Result<SweepReport> {
        let pending = self.load_pending()?;
        let (due, remaining) = partition_due(pending, today);
        let mut report = SweepReport {
            remaining: remaining.len(),
            ..SweepReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        for change in &due {
            match products
                .iter_mut()
                .find(|product| change.applies_to(&product.product_name))
            {
                Some(product) => {
                    change.apply_to(product, today);
                    report.applied.push(change.product_name.clone());
                }
                None => {
                    warn!(product = %change.product_name, "due rate change has no matching product");
                    report.orphaned.push(change.product_name.clone());
                }
            }
        }

        if !report.applied.is_empty() && !catalog.save(products) {
            return Err(LedgerError::Persistence(
                "catalog save failed while applying rate changes".into(),
            ));
        }
        self.write_all(&remaining)?;
        info!(
            applied = report.applied.len(),
            orphaned = report.orphaned.len(),
            remaining = report.remaining,
            "rate sweep finished"
        );
        Ok(report)
    }

    fn write_all(&self, pending: &[FutureRateChange]) -> Result<()> {
        if pending.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
                debug!(path = %self.path.display(), "removed empty rate schedule");
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let tmp = tmp_path(&self.path);
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(SCHEDULE_HEADER)?;
        for change in pending {
            writer.write_record(change_record(change))?;
        }
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn parse_change(columns: &Columns, record: &StringRecord) -> std::result::Result<FutureRateChange, String> {
    let product_name = columns
        .get(record, "Product Name")
        .ok_or("missing product name")?
        .to_string();
    let raw_date = columns
        .get(record, "Effective Date")
        .ok_or("missing effective date")?;
    let effective_date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
        .map_err(|_| format!("Effective Date: `{raw_date}` is not a date"))?;
    Ok(FutureRateChange {
        product_name,
        new_purchase_rate: round2(columns.number(record, "New Purchase Rate")?),
        effective_date,
        margin1: round2(columns.number(record, "Margin1 (%)")?),
        wholesale_rate: round2(columns.number(record, "Wholesale Rate")?),
        margin2: round2(columns.number(record, "Margin2 (%)")?),
        retail_rate: round2(columns.number(record, "Retail Rate")?),
        modified_date: columns.date_or(record, "Modified Date", effective_date),
    })
}

fn change_record(change: &FutureRateChange) -> [String; 8] {
    [
        change.product_name.clone(),
        format!("{:.2}", change.new_purchase_rate),
        change.effective_date.format(DATE_FORMAT).to_string(),
        format!("{:.2}", change.margin1),
        format!("{:.2}", change.wholesale_rate),
        format!("{:.2}", change.margin2),
        format!("{:.2}", change.retail_rate),
        change.modified_date.format(DATE_FORMAT).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CsvCatalogStore;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn change(name: &str, effective: NaiveDate, rate: f64) -> FutureRateChange {
        FutureRateChange {
            product_name: name.into(),
            new_purchase_rate: rate,
            effective_date: effective,
            margin1: 10.0,
            wholesale_rate: rate * 1.1,
            margin2: 0.0,
            retail_rate: 500.0,
            modified_date: day(1),
        }
    }

    fn product(name: &str) -> Product {
        Product {
            brand: "Acme".into(),
            product_name: name.into(),
            purchase_date: day(1),
            purchase_rate: 100.0,
            margin1: 10.0,
            wholesale_rate: 110.0,
            margin2: 20.0,
            retail_rate: 132.0,
            opening_stock: 10,
            purchased_stock: 0,
            sold_stock: 0,
            closing_stock: 10,
            modified_date: day(1),
        }
    }

    fn stores() -> (RateScheduleStore, CsvCatalogStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let schedule = RateScheduleStore::new(temp.path().join("future_rate_changes.csv"));
        let catalog = CsvCatalogStore::new(temp.path().join("products.csv"));
        (schedule, catalog, temp)
    }

    #[test]
    fn empty_and_headerless_files_mean_nothing_pending() {
        let (schedule, _, _guard) = stores();
        fs::write(schedule.path(), "").unwrap();
        assert!(schedule.load_pending().unwrap().is_empty());
        fs::write(schedule.path(), "Bulb,200.00,2024-07-05\n").unwrap();
        assert!(schedule.load_pending().unwrap().is_empty());
    }

    #[test]
    fn scheduling_replaces_pending_change_for_same_product() {
        let (schedule, _, _guard) = stores();
        schedule.schedule(change("Bulb", day(5), 150.0)).unwrap();
        schedule.schedule(change("Tube", day(6), 80.0)).unwrap();
        schedule.schedule(change("bulb", day(9), 175.0)).unwrap();
        let pending = schedule.load_pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].product_name, "Tube");
        assert_eq!(pending[1].new_purchase_rate, 175.0);
        assert_eq!(pending[1].effective_date, day(9));
    }

    #[test]
    fn sweep_applies_due_and_keeps_the_rest() {
        let (schedule, catalog, _guard) = stores();
        schedule.schedule(change("Bulb", day(5), 150.0)).unwrap();
        schedule.schedule(change("Tube", day(20), 80.0)).unwrap();
        let mut products = vec![product("Bulb"), product("Tube")];

        let report = schedule.sweep(day(5), &mut products, &catalog).unwrap();
        assert_eq!(report.applied, vec!["Bulb".to_string()]);
        assert_eq!(report.remaining, 1);
        assert_eq!(products[0].purchase_rate, 150.0);
        assert_eq!(products[0].purchase_date, day(5));
        assert_eq!(products[0].retail_rate, 500.0);
        assert_eq!(products[0].modified_date, day(5));
        assert_eq!(products[1].purchase_rate, 100.0);
        assert!(catalog.path().exists());
        assert_eq!(schedule.load_pending().unwrap().len(), 1);
    }

    #[test]
    fn sweep_removes_file_when_nothing_remains() {
        let (schedule, catalog, _guard) = stores();
        schedule.schedule(change("Bulb", day(3), 150.0)).unwrap();
        let mut products = vec![product("Bulb")];
        schedule.sweep(day(4), &mut products, &catalog).unwrap();
        assert!(!schedule.path().exists());
    }

    #[test]
    fn orphaned_changes_are_discarded_without_saving_catalog() {
        let (schedule, catalog, _guard) = stores();
        schedule.schedule(change("Ghost", day(2), 10.0)).unwrap();
        let mut products = vec![product("Bulb")];
        let report = schedule.sweep(day(2), &mut products, &catalog).unwrap();
        assert_eq!(report.orphaned, vec!["Ghost".to_string()]);
        assert!(report.applied.is_empty());
        assert!(!catalog.path().exists());
        assert!(schedule.load_pending().unwrap().is_empty());
    }

    #[test]
    fn pending_rows_read_back_at_two_decimals() {
        let (schedule, _, _guard) = stores();
        fs::write(
            schedule.path(),
            format!(
                "{}\nBulb,120.004,2024-07-05,12.345,134.8,0,150.556,2024-07-01\n",
                SCHEDULE_HEADER.join(",")
            ),
        )
        .unwrap();
        let first = schedule.load_pending().unwrap();
        schedule.write_all(&first).unwrap();
        assert_eq!(schedule.load_pending().unwrap(), first);
        assert_eq!(first[0].new_purchase_rate, 120.0);
        assert_eq!(first[0].retail_rate, 150.56);
    }

    #[test]
    fn sweep_before_effective_date_is_noop() {
        let (schedule, catalog, _guard) = stores();
        schedule.schedule(change("Bulb", day(10), 150.0)).unwrap();
        let mut products = vec![product("Bulb")];
        let report = schedule.sweep(day(9), &mut products, &catalog).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.remaining, 1);
        assert_eq!(products[0].purchase_rate, 100.0);
    }
}

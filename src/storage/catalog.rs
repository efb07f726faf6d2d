use chrono::{Local, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, warn};

use crate::{
    errors::LedgerError,
    ledger::Product,
    utils::paths::ensure_dir,
};

use super::{BackupInfo, ProductStore, Result};

pub const CATALOG_HEADER: [&str; 13] = [
    "Brand",
    "Product Name",
    "Purchase Date",
    "Purchase Rate",
    "Margin1 (%)",
    "Wholesale Rate",
    "Margin2 (%)",
    "Retail Rate",
    "Opening Stock",
    "Purchased Stock",
    "Sold Stock",
    "Closing Stock",
    "Modified Date",
];

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
const BACKUP_MARKER: &str = "_backup_";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BACKUP_EXTENSION: &str = "csv";

/// CSV-backed product catalog.
///
/// Every save renames the previous file to a timestamped backup in the same
/// directory and then writes the new snapshot. The two steps are not atomic.
#[derive(Debug, Clone)]
pub struct CsvCatalogStore {
    path: PathBuf,
    retention: Option<usize>,
}

impl CsvCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: None,
        }
    }

    /// Keeps at most `retention` backups after each save.
    pub fn with_retention(mut self, retention: Option<usize>) -> Self {
        self.retention = retention.map(|keep| keep.max(1));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the catalog, recomputing every derived field from the stored
    /// inputs. Rows with unparseable numbers or out-of-range stock counters
    /// are dropped.
    pub fn load_with_today(&self, today: NaiveDate) -> Result<Vec<Product>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "catalog file does not exist");
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let columns = Columns::new(reader.headers()?);

        let mut products = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let row = index + 2;
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    warn!(row, error = %err, "skipping unreadable catalog row");
                    continue;
                }
            };
            match parse_product(&columns, &record, today) {
                Ok(product) => products.push(product),
                Err(reason) => warn!(row, %reason, "dropping catalog row"),
            }
        }
        debug!(count = products.len(), "loaded products");
        Ok(products)
    }

    /// Fallible core of [`ProductStore::save`]: backs up the current file and
    /// writes `products` in the fixed column order.
    pub fn write_snapshot(&self, products: &[Product]) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        if self.path.exists() {
            let backup = self.next_backup_path();
            fs::rename(&self.path, &backup)?;
            info!(backup = %backup.display(), "created catalog backup");
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(CATALOG_HEADER)?;
        for product in products {
            writer.write_record(product_record(product))?;
        }
        writer.flush()?;

        if let Some(keep) = self.retention {
            self.prune_backups(keep)?;
        }
        Ok(self.path.clone())
    }

    /// Backups of this catalog, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let dir = self.directory();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = self.backup_prefix();
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let Some(stamp) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&format!(".{BACKUP_EXTENSION}")))
            else {
                continue;
            };
            let created_at = parse_backup_timestamp(stamp);
            entries.push(BackupInfo {
                path,
                name,
                created_at,
            });
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.name.cmp(&a.name)));
        Ok(entries)
    }

    /// Copies the named backup over the live catalog and reloads it.
    pub fn restore_backup(&self, backup_name: &str, today: NaiveDate) -> Result<Vec<Product>> {
        let backup = self
            .list_backups()?
            .into_iter()
            .find(|info| info.name == backup_name)
            .ok_or_else(|| {
                LedgerError::Persistence(format!("backup `{}` not found", backup_name))
            })?;
        fs::copy(&backup.path, &self.path)?;
        info!(backup = %backup.name, "restored catalog from backup");
        self.load_with_today(today)
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn backup_prefix(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("products");
        format!("{stem}{BACKUP_MARKER}")
    }

    fn next_backup_path(&self) -> PathBuf {
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let base = format!("{}{}", self.backup_prefix(), timestamp);
        let dir = self.directory();
        let mut candidate = dir.join(format!("{base}.{BACKUP_EXTENSION}"));
        let mut attempt = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{base}_{attempt}.{BACKUP_EXTENSION}"));
            attempt += 1;
        }
        candidate
    }

    fn prune_backups(&self, keep: usize) -> Result<()> {
        for stale in self.list_backups()?.into_iter().skip(keep) {
            if let Err(err) = fs::remove_file(&stale.path) {
                warn!(backup = %stale.name, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl ProductStore for CsvCatalogStore {
    fn load(&self, today: NaiveDate) -> Result<Vec<Product>> {
        self.load_with_today(today)
    }

    fn save(&self, products: &[Product]) -> bool {
        if products.is_empty() {
            debug!("refusing to save an empty catalog");
            return false;
        }
        match self.write_snapshot(products) {
            Ok(path) => {
                debug!(count = products.len(), path = %path.display(), "catalog saved");
                true
            }
            Err(err) => {
                error!(error = %err, path = %self.path.display(), "failed to save catalog");
                false
            }
        }
    }
}

/// Header-name lookup so rows survive reordered or missing columns.
pub(crate) struct Columns {
    names: Vec<String>,
}

impl Columns {
    pub(crate) fn new(headers: &StringRecord) -> Self {
        Self {
            names: headers.iter().map(|name| name.trim().to_string()).collect(),
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    /// Non-blank value of column `name`, if present in both header and row.
    pub(crate) fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        let index = self.names.iter().position(|candidate| candidate == name)?;
        record.get(index).map(str::trim).filter(|value| !value.is_empty())
    }

    pub(crate) fn number(&self, record: &StringRecord, name: &str) -> std::result::Result<f64, String> {
        match self.get(record, name) {
            None => Ok(0.0),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("{name}: `{raw}` is not a number")),
        }
    }

    fn count(&self, record: &StringRecord, name: &str) -> std::result::Result<i64, String> {
        match self.get(record, name) {
            None => Ok(0),
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| format!("{name}: `{raw}` is not an integer")),
        }
    }

    pub(crate) fn date_or(&self, record: &StringRecord, name: &str, fallback: NaiveDate) -> NaiveDate {
        match self.get(record, name) {
            None => fallback,
            Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap_or_else(|_| {
                warn!(column = name, value = raw, "unparseable date, using fallback");
                fallback
            }),
        }
    }
}

fn parse_product(
    columns: &Columns,
    record: &StringRecord,
    today: NaiveDate,
) -> std::result::Result<Product, String> {
    let mut product = Product {
        brand: columns.get(record, "Brand").unwrap_or_default().to_string(),
        product_name: columns
            .get(record, "Product Name")
            .unwrap_or_default()
            .to_string(),
        purchase_date: columns.date_or(record, "Purchase Date", today),
        purchase_rate: columns.number(record, "Purchase Rate")?,
        margin1: columns.number(record, "Margin1 (%)")?,
        wholesale_rate: columns.number(record, "Wholesale Rate")?,
        margin2: columns.number(record, "Margin2 (%)")?,
        retail_rate: columns.number(record, "Retail Rate")?,
        opening_stock: columns.count(record, "Opening Stock")?,
        purchased_stock: columns.count(record, "Purchased Stock")?,
        sold_stock: columns.count(record, "Sold Stock")?,
        closing_stock: 0,
        modified_date: columns.date_or(record, "Modified Date", today),
    };
    product.recompute_rates();
    product
        .recompute_closing()
        .map_err(|err| err.to_string())?;
    Ok(product)
}

fn product_record(product: &Product) -> [String; 13] {
    [
        product.brand.clone(),
        product.product_name.clone(),
        product.purchase_date.format(DATE_FORMAT).to_string(),
        format!("{:.2}", product.purchase_rate),
        format!("{:.2}", product.margin1),
        format!("{:.2}", product.wholesale_rate),
        format!("{:.2}", product.margin2),
        format!("{:.2}", product.retail_rate),
        product.opening_stock.to_string(),
        product.purchased_stock.to_string(),
        product.sold_stock.to_string(),
        product.closing_stock.to_string(),
        product.modified_date.format(DATE_FORMAT).to_string(),
    ]
}

fn parse_backup_timestamp(stamp: &str) -> Option<NaiveDateTime> {
    let digits = stamp.get(..15)?;
    NaiveDateTime::parse_from_str(digits, BACKUP_TIMESTAMP_FORMAT).ok()
}

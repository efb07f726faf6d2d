//! Runtime configuration stored as `config.json` in the application directory.

use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::LedgerError,
    ledger::DEFAULT_GST_PERCENT,
    utils::paths::{app_data_dir, config_file_in, ensure_dir, tmp_path},
};

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the catalog, schedule and counter files. Relative
    /// paths resolve against the application directory.
    pub data_dir: PathBuf,
    pub catalog_file: String,
    pub schedule_file: String,
    pub bill_counter_file: String,
    pub purchase_counter_file: String,
    /// Saved bills and purchase/payment logs, inside the data directory.
    pub records_dir: String,
    pub sweep_interval_secs: u64,
    /// Number of catalog backups to keep; `None` keeps every backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention: Option<usize>,
    pub gst_percent: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            catalog_file: "products.csv".into(),
            schedule_file: "future_rate_changes.csv".into(),
            bill_counter_file: "last_bill.txt".into(),
            purchase_counter_file: "last_purchase_bill.txt".into(),
            records_dir: "records".into(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            backup_retention: None,
            gst_percent: DEFAULT_GST_PERCENT,
        }
    }
}

impl Config {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn resolve_data_dir(&self, base: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            base.join(&self.data_dir)
        }
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, LedgerError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, LedgerError> {
        ensure_dir(&base)?;
        let path = config_file_in(&base);
        Ok(Self { base, path })
    }

    pub fn load(&self) -> Result<Config, LedgerError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Data directory for `config`, created if needed.
    pub fn data_dir(&self, config: &Config) -> Result<PathBuf, LedgerError> {
        let dir = config.resolve_data_dir(&self.base);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::LedgerError;

use super::Result;

const INITIAL_VALUE: u64 = 1;

/// Monotonic bill number kept as a bare integer in a side file.
///
/// The file holds the last number handed out; a missing file starts the
/// sequence at 1, so the first number issued is 2.
#[derive(Debug, Clone)]
pub struct BillCounter {
    path: PathBuf,
    prefix: &'static str,
}

impl BillCounter {
    /// Sale bills: `0002`, `0003`, ...
    pub fn sales(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prefix: "",
        }
    }

    /// Purchase bills: `P0002`, `P0003`, ...
    pub fn purchases(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prefix: "P",
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next(&self) -> Result<String> {
        self.issue(|_| Ok(())).map(|(number, ())| number)
    }

    /// Hands the next number to `use_number` and records it as spent only
    /// when that succeeds, so a failed bill does not burn a number.
    pub fn issue<T>(&self, use_number: impl FnOnce(&str) -> Result<T>) -> Result<(String, T)> {
        let next = self.last()?.checked_add(1).ok_or_else(|| {
            LedgerError::Persistence(format!(
                "bill counter `{}` is exhausted",
                self.path.display()
            ))
        })?;
        let number = format!("{}{:04}", self.prefix, next);
        let value = use_number(&number)?;
        fs::write(&self.path, next.to_string())?;
        Ok((number, value))
    }

    fn last(&self) -> Result<u64> {
        if !self.path.exists() {
            fs::write(&self.path, INITIAL_VALUE.to_string())?;
            return Ok(INITIAL_VALUE);
        }
        let raw = fs::read_to_string(&self.path)?;
        raw.trim().parse::<u64>().map_err(|_| {
            LedgerError::Persistence(format!(
                "bill counter `{}` holds `{}`, expected an integer",
                self.path.display(),
                raw.trim()
            ))
        })
    }
}

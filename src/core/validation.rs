//! Boundary checks for raw form input. Nothing that fails here reaches the ledger.

use chrono::NaiveDate;

use crate::errors::LedgerError;
use crate::ledger::round2;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// A sale or purchase quantity: a positive whole number.
pub fn parse_quantity(raw: &str) -> Result<i64, LedgerError> {
    let trimmed = raw.trim();
    let quantity = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            let value = trimmed
                .parse::<f64>()
                .map_err(|_| LedgerError::validation("Invalid quantity format"))?;
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(LedgerError::validation("Quantity must be a whole number"));
            }
            if value.abs() >= i64::MAX as f64 {
                return Err(LedgerError::validation("Quantity is too large"));
            }
            value as i64
        }
    };
    if quantity <= 0 {
        return Err(LedgerError::validation("Quantity must be positive"));
    }
    Ok(quantity)
}

/// A rate or amount, rounded to two decimals. Currency symbols and thousands
/// separators are ignored.
pub fn parse_rate(raw: &str) -> Result<f64, LedgerError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | ','))
        .collect();
    let rate = cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| LedgerError::validation(format!("Invalid rate format: `{}`", raw.trim())))?;
    if rate < 0.0 {
        return Err(LedgerError::validation("Rate must not be negative"));
    }
    Ok(round2(rate))
}

/// A margin percentage to two decimals; blank means `0`, the manual-rate
/// sentinel.
pub fn parse_margin(raw: &str) -> Result<f64, LedgerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(round2)
        .ok_or_else(|| LedgerError::validation(format!("Invalid margin: `{trimmed}`")))
}

/// A stock counter from the product form; blank means `0`.
pub fn parse_stock(raw: &str) -> Result<i64, LedgerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let value = trimmed
        .parse::<i64>()
        .map_err(|_| LedgerError::validation(format!("Invalid stock count: `{trimmed}`")))?;
    if value < 0 {
        return Err(LedgerError::validation("Stock counts must not be negative"));
    }
    Ok(value)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, LedgerError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| LedgerError::validation(format!("Invalid date: `{trimmed}`")))
}

pub fn require_identity(brand: &str, product_name: &str) -> Result<(), LedgerError> {
    if brand.trim().is_empty() || product_name.trim().is_empty() {
        return Err(LedgerError::validation(
            "Brand and Product Name are required",
        ));
    }
    Ok(())
}

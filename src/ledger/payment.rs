use chrono::NaiveDate;

use crate::errors::LedgerError;

use super::rates::round2;

/// Customer or supplier details carried onto saved bills.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Party {
    pub name: String,
    pub phone: String,
    pub place: String,
    pub site: String,
}

impl Party {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// How a bill was settled at the counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub payment_type: String,
    pub amount_paid: f64,
}

impl Default for Payment {
    fn default() -> Self {
        Self {
            payment_type: "Cash".into(),
            amount_paid: 0.0,
        }
    }
}

impl Payment {
    /// Amount still owed on `total`; never negative.
    pub fn remaining(&self, total: f64) -> f64 {
        round2((total - self.amount_paid).max(0.0))
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if !(self.amount_paid.is_finite() && self.amount_paid >= 0.0) {
            return Err(LedgerError::validation("Amount paid must not be negative"));
        }
        Ok(())
    }
}

/// Money received from a customer against earlier sales, split by mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReceipt {
    pub date: NaiveDate,
    pub customer: String,
    pub cash: f64,
    pub cheque: f64,
    pub bank_transfer: f64,
}

impl SalesReceipt {
    pub fn amount(&self) -> f64 {
        round2(self.cash + self.cheque + self.bank_transfer)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.customer.trim().is_empty() {
            return Err(LedgerError::validation("Customer is required"));
        }
        let modes = [self.cash, self.cheque, self.bank_transfer];
        if modes.iter().any(|amount| !(amount.is_finite() && *amount >= 0.0)) {
            return Err(LedgerError::validation("Payment amounts must not be negative"));
        }
        if self.amount() <= 0.0 {
            return Err(LedgerError::validation("Amount received must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(cash: f64, cheque: f64) -> SalesReceipt {
        SalesReceipt {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            customer: "Ravi".into(),
            cash,
            cheque,
            bank_transfer: 0.0,
        }
    }

    #[test]
    fn remaining_never_goes_negative() {
        let payment = Payment {
            payment_type: "UPI".into(),
            amount_paid: 500.0,
        };
        assert_eq!(payment.remaining(389.4), 0.0);
        assert_eq!(payment.remaining(1200.0), 700.0);
    }

    #[test]
    fn receipt_needs_a_positive_amount() {
        assert_eq!(receipt(100.0, 50.5).amount(), 150.5);
        assert!(receipt(100.0, 0.0).validate().is_ok());
        assert!(receipt(0.0, 0.0).validate().is_err());
        assert!(receipt(100.0, -1.0).validate().is_err());
    }
}

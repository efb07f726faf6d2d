use chrono::NaiveDate;

use super::{
    product::{same_product_name, Product},
    rates::{derive_tiers, round2},
};

/// A price change waiting for its effective date.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureRateChange {
    pub product_name: String,
    pub new_purchase_rate: f64,
    pub effective_date: NaiveDate,
    pub margin1: f64,
    pub wholesale_rate: f64,
    pub margin2: f64,
    pub retail_rate: f64,
    pub modified_date: NaiveDate,
}

impl FutureRateChange {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        today >= self.effective_date
    }

    pub fn applies_to(&self, product_name: &str) -> bool {
        same_product_name(&self.product_name, product_name)
    }

    /// Copies the change onto `product`; the purchase date becomes the
    /// effective date.
    pub fn apply_to(&self, product: &mut Product, today: NaiveDate) {
        product.purchase_rate = self.new_purchase_rate;
        product.purchase_date = self.effective_date;
        product.margin1 = self.margin1;
        product.wholesale_rate = self.wholesale_rate;
        product.margin2 = self.margin2;
        product.retail_rate = self.retail_rate;
        product.modified_date = today;
    }

    pub fn rates(&self) -> RateQuote {
        RateQuote {
            purchase_rate: self.new_purchase_rate,
            margin1: self.margin1,
            wholesale_rate: self.wholesale_rate,
            margin2: self.margin2,
            retail_rate: self.retail_rate,
        }
    }
}

/// Rate edit captured from the rate-change form.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEdit {
    pub product_name: String,
    pub new_purchase_rate: f64,
    pub effective_date: NaiveDate,
    pub margin1: f64,
    pub manual_wholesale: f64,
    pub margin2: f64,
    pub manual_retail: f64,
}

impl RateEdit {
    /// Resolves the margins into concrete rates, stamped with `today`. Rates
    /// and margins are held to two decimals, as the schedule file stores them.
    pub fn into_change(self, today: NaiveDate) -> FutureRateChange {
        let new_purchase_rate = round2(self.new_purchase_rate);
        let margin1 = round2(self.margin1);
        let margin2 = round2(self.margin2);
        let (wholesale_rate, retail_rate) = derive_tiers(
            new_purchase_rate,
            margin1,
            round2(self.manual_wholesale),
            margin2,
            round2(self.manual_retail),
        );
        FutureRateChange {
            product_name: self.product_name.trim().to_string(),
            new_purchase_rate,
            effective_date: self.effective_date,
            margin1,
            wholesale_rate,
            margin2,
            retail_rate,
            modified_date: today,
        }
    }
}

/// The rate fields of a product or pending change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateQuote {
    pub purchase_rate: f64,
    pub margin1: f64,
    pub wholesale_rate: f64,
    pub margin2: f64,
    pub retail_rate: f64,
}

impl From<&Product> for RateQuote {
    fn from(product: &Product) -> Self {
        Self {
            purchase_rate: product.purchase_rate,
            margin1: product.margin1,
            wholesale_rate: product.wholesale_rate,
            margin2: product.margin2,
            retail_rate: product.retail_rate,
        }
    }
}

/// Splits pending changes into those due on `today` and those still waiting,
/// preserving order within each group.
pub fn partition_due(
    pending: Vec<FutureRateChange>,
    today: NaiveDate,
) -> (Vec<FutureRateChange>, Vec<FutureRateChange>) {
    pending.into_iter().partition(|change| change.is_due(today))
}

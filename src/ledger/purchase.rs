use chrono::NaiveDate;

use super::{
    payment::{Party, Payment},
    product::ProductKey,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseLine {
    pub brand: String,
    pub product_name: String,
    pub quantity: i64,
    pub rate: f64,
}

impl PurchaseLine {
    pub fn key(&self) -> ProductKey {
        ProductKey::new(&self.brand, &self.product_name)
    }

    pub fn total(&self) -> f64 {
        self.quantity as f64 * self.rate
    }
}

/// Supplier receipt; every line adds to the matching product's purchased stock.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub bill_no: String,
    pub date: NaiveDate,
    pub supplier: Party,
    pub payment: Payment,
    pub lines: Vec<PurchaseLine>,
}

impl PurchaseReceipt {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(PurchaseLine::total).sum()
    }

    pub fn remaining(&self) -> f64 {
        self.payment.remaining(self.total())
    }
}

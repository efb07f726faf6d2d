use std::{fmt, str::FromStr};

use chrono::NaiveDate;

use super::{
    payment::{Party, Payment},
    rates::round2,
};

pub const DEFAULT_GST_PERCENT: f64 = 18.0;

/// Which rate tier a sale is billed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    Wholesale,
    Retail,
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceTier::Wholesale => f.write_str("Wholesale"),
            PriceTier::Retail => f.write_str("Retail"),
        }
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "wholesale" => Ok(PriceTier::Wholesale),
            "r" | "retail" => Ok(PriceTier::Retail),
            other => Err(format!("unknown price tier `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillLine {
    pub brand: String,
    pub product_name: String,
    pub quantity: i64,
    pub tier: PriceTier,
    pub rate: f64,
    pub amount: f64,
}

impl BillLine {
    pub fn new(
        brand: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        tier: PriceTier,
        rate: f64,
    ) -> Self {
        Self {
            brand: brand.into(),
            product_name: product_name.into(),
            quantity,
            tier,
            rate,
            amount: quantity as f64 * rate,
        }
    }
}

/// Sale bill under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bill {
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    pub lines: Vec<BillLine>,
}

impl Bill {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(|line| line.amount).sum()
    }

    pub fn gst_amount(&self, gst_percent: f64) -> f64 {
        round2(self.subtotal() * gst_percent / 100.0)
    }

    pub fn total(&self, include_gst: bool, gst_percent: f64) -> f64 {
        if include_gst {
            round2(self.subtotal() * (1.0 + gst_percent / 100.0))
        } else {
            self.subtotal()
        }
    }
}

/// Customer and settlement details recorded when a bill is finished.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub customer: Party,
    pub customer_type: PriceTier,
    pub payment: Payment,
    pub include_gst: bool,
    pub gst_percent: f64,
}

impl Default for Checkout {
    fn default() -> Self {
        Self {
            customer: Party::default(),
            customer_type: PriceTier::Retail,
            payment: Payment::default(),
            include_gst: true,
            gst_percent: DEFAULT_GST_PERCENT,
        }
    }
}

impl Checkout {
    pub fn total(&self, bill: &Bill) -> f64 {
        bill.total(self.include_gst, self.gst_percent)
    }

    pub fn remaining(&self, bill: &Bill) -> f64 {
        self.payment.remaining(self.total(bill))
    }
}

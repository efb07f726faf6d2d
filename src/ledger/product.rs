use std::fmt;

use chrono::NaiveDate;

use crate::errors::LedgerError;

use super::{
    bill::PriceTier,
    rates::{derive_tiers, round2},
    stock::{clamp_sold, closing_stock, StockSnapshot},
};

/// Case-insensitive `(brand, product name)` identity of a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    brand: String,
    product_name: String,
}

impl ProductKey {
    pub fn new(brand: &str, product_name: &str) -> Self {
        Self {
            brand: normalize(brand),
            product_name: normalize(product_name),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        normalize(&product.brand) == self.brand
            && normalize(&product.product_name) == self.product_name
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.brand, self.product_name)
    }
}

/// Compares product names the way the catalog does, ignoring case and padding.
pub fn same_product_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn counters_out_of_range(product_name: &str) -> LedgerError {
    LedgerError::validation(format!(
        "Stock counters for `{}` are out of range",
        product_name.trim()
    ))
}

/// One catalog row: identity, pricing tiers and the stock ledger counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub brand: String,
    pub product_name: String,
    pub purchase_date: NaiveDate,
    pub purchase_rate: f64,
    pub margin1: f64,
    pub wholesale_rate: f64,
    pub margin2: f64,
    pub retail_rate: f64,
    pub opening_stock: i64,
    pub purchased_stock: i64,
    pub sold_stock: i64,
    pub closing_stock: i64,
    pub modified_date: NaiveDate,
}

impl Product {
    pub fn key(&self) -> ProductKey {
        ProductKey::new(&self.brand, &self.product_name)
    }

    pub fn stock(&self) -> StockSnapshot {
        StockSnapshot {
            opening: self.opening_stock,
            purchased: self.purchased_stock,
            sold: self.sold_stock,
            closing: self.closing_stock,
        }
    }

    pub fn rate_for(&self, tier: PriceTier) -> f64 {
        match tier {
            PriceTier::Wholesale => self.wholesale_rate,
            PriceTier::Retail => self.retail_rate,
        }
    }

    /// Rounds the stored rates and margins to two decimals, then re-derives
    /// both tiers, treating the stored tier values as the manual entries for
    /// zero margins.
    pub fn recompute_rates(&mut self) {
        self.purchase_rate = round2(self.purchase_rate);
        self.margin1 = round2(self.margin1);
        self.margin2 = round2(self.margin2);
        let (wholesale, retail) = derive_tiers(
            self.purchase_rate,
            self.margin1,
            round2(self.wholesale_rate),
            self.margin2,
            round2(self.retail_rate),
        );
        self.wholesale_rate = wholesale;
        self.retail_rate = retail;
    }

    pub fn recompute_closing(&mut self) -> Result<(), LedgerError> {
        self.set_counters(self.purchased_stock, self.sold_stock)
    }

    /// Replaces purchased and sold together, leaving the record untouched
    /// when the closing stock would not fit.
    fn set_counters(&mut self, purchased: i64, sold: i64) -> Result<(), LedgerError> {
        let closing = closing_stock(self.opening_stock, purchased, sold)
            .ok_or_else(|| counters_out_of_range(&self.product_name))?;
        self.purchased_stock = purchased;
        self.sold_stock = sold;
        self.closing_stock = closing;
        Ok(())
    }

    /// Adds to the sold counter and rebalances closing stock.
    pub fn record_sale(&mut self, quantity: i64, today: NaiveDate) -> Result<(), LedgerError> {
        let sold = self
            .sold_stock
            .checked_add(quantity)
            .map(clamp_sold)
            .ok_or_else(|| counters_out_of_range(&self.product_name))?;
        self.set_counters(self.purchased_stock, sold)?;
        self.modified_date = today;
        Ok(())
    }

    /// Takes a previously sold quantity back, never driving sold below zero.
    pub fn reverse_sale(&mut self, quantity: i64, today: NaiveDate) -> Result<(), LedgerError> {
        let sold = self
            .sold_stock
            .checked_sub(quantity)
            .map(clamp_sold)
            .ok_or_else(|| counters_out_of_range(&self.product_name))?;
        self.set_counters(self.purchased_stock, sold)?;
        self.modified_date = today;
        Ok(())
    }

    /// Accumulates received stock and takes over the receipt's cost basis.
    pub fn record_receipt(
        &mut self,
        quantity: i64,
        rate: f64,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), LedgerError> {
        let purchased = self
            .purchased_stock
            .checked_add(quantity)
            .ok_or_else(|| counters_out_of_range(&self.product_name))?;
        self.set_counters(purchased, self.sold_stock)?;
        self.purchase_rate = round2(rate);
        self.purchase_date = date;
        self.modified_date = today;
        Ok(())
    }
}

/// Values captured by the product form for a catalog add or update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductEntry {
    pub brand: String,
    pub product_name: String,
    pub purchase_date: NaiveDate,
    pub purchase_rate: f64,
    pub margin1: f64,
    pub manual_wholesale: f64,
    pub margin2: f64,
    pub manual_retail: f64,
    /// Expected to be the record's previous closing stock; not checked.
    pub opening_stock: i64,
    pub purchased_stock: i64,
}

impl ProductEntry {
    pub fn key(&self) -> ProductKey {
        ProductKey::new(&self.brand, &self.product_name)
    }

    /// Rates and margins at the two decimals the catalog file keeps.
    fn rounded(&self) -> Self {
        Self {
            purchase_rate: round2(self.purchase_rate),
            margin1: round2(self.margin1),
            manual_wholesale: round2(self.manual_wholesale),
            margin2: round2(self.margin2),
            manual_retail: round2(self.manual_retail),
            ..self.clone()
        }
    }

    pub fn rates(&self) -> (f64, f64) {
        let entry = self.rounded();
        derive_tiers(
            entry.purchase_rate,
            entry.margin1,
            entry.manual_wholesale,
            entry.margin2,
            entry.manual_retail,
        )
    }

    /// Builds a fresh record: nothing sold yet, closing = opening + purchased.
    pub fn into_product(self, today: NaiveDate) -> Result<Product, LedgerError> {
        let entry = self.rounded();
        let (wholesale_rate, retail_rate) = entry.rates();
        let closing_stock = closing_stock(entry.opening_stock, entry.purchased_stock, 0)
            .ok_or_else(|| counters_out_of_range(&entry.product_name))?;
        Ok(Product {
            brand: entry.brand.trim().to_string(),
            product_name: entry.product_name.trim().to_string(),
            purchase_date: entry.purchase_date,
            purchase_rate: entry.purchase_rate,
            margin1: entry.margin1,
            wholesale_rate,
            margin2: entry.margin2,
            retail_rate,
            opening_stock: entry.opening_stock,
            purchased_stock: entry.purchased_stock,
            sold_stock: 0,
            closing_stock,
            modified_date: today,
        })
    }

    /// Overwrites an existing record. Purchased stock is replaced, not added to,
    /// and the sold counter restarts from zero.
    pub fn overwrite(&self, product: &mut Product, today: NaiveDate) -> Result<(), LedgerError> {
        let replacement = self.clone().into_product(today)?;
        product.purchase_date = replacement.purchase_date;
        product.purchase_rate = replacement.purchase_rate;
        product.margin1 = replacement.margin1;
        product.wholesale_rate = replacement.wholesale_rate;
        product.margin2 = replacement.margin2;
        product.retail_rate = replacement.retail_rate;
        product.opening_stock = replacement.opening_stock;
        product.purchased_stock = replacement.purchased_stock;
        product.sold_stock = 0;
        product.closing_stock = replacement.closing_stock;
        product.modified_date = today;
        Ok(())
    }
}

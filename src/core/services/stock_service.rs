use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::core::validation::require_identity;
use crate::errors::LedgerError;
use crate::ledger::{
    BillLine, PriceTier, Product, ProductEntry, ProductKey, PurchaseReceipt, StockSnapshot,
};

use super::ServiceResult;

/// Whether a catalog edit created a record or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(StockSnapshot),
    Updated(StockSnapshot),
}

impl UpsertOutcome {
    pub fn stock(&self) -> StockSnapshot {
        match self {
            UpsertOutcome::Created(stock) | UpsertOutcome::Updated(stock) => *stock,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// What a purchase receipt touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptSummary {
    pub matched: Vec<String>,
    /// Lines whose product is not in the catalog; they are skipped.
    pub unmatched: Vec<String>,
    pub total: f64,
}

/// Stock-ledger mutations: catalog edits, purchase receipts and sales.
pub struct StockService;

impl StockService {
    pub fn find<'a>(products: &'a [Product], key: &ProductKey) -> Option<&'a Product> {
        products.iter().find(|product| key.matches(product))
    }

    fn find_mut<'a>(products: &'a mut [Product], key: &ProductKey) -> Option<&'a mut Product> {
        products.iter_mut().find(|product| key.matches(product))
    }

    pub fn upsert(
        products: &mut Vec<Product>,
        entry: ProductEntry,
        today: NaiveDate,
    ) -> ServiceResult<UpsertOutcome> {
        Self::validate_entry(&entry)?;
        let key = entry.key();
        if let Some(product) = Self::find_mut(products, &key) {
            entry.overwrite(product, today)?;
            debug!(product = %key, closing = product.closing_stock, "catalog record overwritten");
            return Ok(UpsertOutcome::Updated(product.stock()));
        }
        let product = entry.into_product(today)?;
        let stock = product.stock();
        debug!(product = %key, closing = stock.closing, "catalog record created");
        products.push(product);
        Ok(UpsertOutcome::Created(stock))
    }

    /// Adds every matched line to purchased stock; the last line for a
    /// product decides its purchase rate.
    pub fn receive(
        products: &mut [Product],
        receipt: &PurchaseReceipt,
        today: NaiveDate,
    ) -> ServiceResult<ReceiptSummary> {
        if receipt.lines.is_empty() {
            return Err(LedgerError::validation("Purchase receipt has no lines"));
        }
        for line in &receipt.lines {
            require_identity(&line.brand, &line.product_name)?;
            if line.quantity <= 0 {
                return Err(LedgerError::validation(format!(
                    "Quantity for `{}` must be positive",
                    line.product_name
                )));
            }
            if !(line.rate >= 0.0) {
                return Err(LedgerError::validation(format!(
                    "Rate for `{}` must not be negative",
                    line.product_name
                )));
            }
        }

        let mut summary = ReceiptSummary {
            total: receipt.total(),
            ..ReceiptSummary::default()
        };
        for line in &receipt.lines {
            match Self::find_mut(products, &line.key()) {
                Some(product) => {
                    product.record_receipt(line.quantity, line.rate, receipt.date, today)?;
                    summary.matched.push(product.product_name.clone());
                }
                None => {
                    warn!(
                        brand = %line.brand,
                        product = %line.product_name,
                        "purchase line has no catalog record"
                    );
                    summary.unmatched.push(line.product_name.clone());
                }
            }
        }
        Ok(summary)
    }

    pub fn sell(
        products: &mut [Product],
        key: &ProductKey,
        quantity: i64,
        tier: PriceTier,
        today: NaiveDate,
    ) -> ServiceResult<BillLine> {
        if quantity <= 0 {
            return Err(LedgerError::validation("Quantity must be positive"));
        }
        let product = Self::find_mut(products, key)
            .ok_or_else(|| LedgerError::ProductNotFound(key.to_string()))?;
        let line = BillLine::new(
            product.brand.clone(),
            product.product_name.clone(),
            quantity,
            tier,
            product.rate_for(tier),
        );
        product.record_sale(quantity, today)?;
        if product.closing_stock < 0 {
            warn!(product = %key, closing = product.closing_stock, "sale drives closing stock negative");
        }
        Ok(line)
    }

    /// Reverses a sale line. Returns `false` when the product is gone.
    pub fn unsell(
        products: &mut [Product],
        line: &BillLine,
        today: NaiveDate,
    ) -> ServiceResult<bool> {
        let key = ProductKey::new(&line.brand, &line.product_name);
        match Self::find_mut(products, &key) {
            Some(product) => {
                product.reverse_sale(line.quantity, today)?;
                Ok(true)
            }
            None => {
                warn!(product = %key, "deleted bill line refers to a removed product");
                Ok(false)
            }
        }
    }

    pub fn remove(products: &mut Vec<Product>, key: &ProductKey) -> ServiceResult<Product> {
        let index = products
            .iter()
            .position(|product| key.matches(product))
            .ok_or_else(|| LedgerError::ProductNotFound(key.to_string()))?;
        Ok(products.remove(index))
    }

    fn validate_entry(entry: &ProductEntry) -> ServiceResult<()> {
        require_identity(&entry.brand, &entry.product_name)?;
        if !(entry.purchase_rate >= 0.0) {
            return Err(LedgerError::validation("Purchase rate must not be negative"));
        }
        if entry.opening_stock < 0 || entry.purchased_stock < 0 {
            return Err(LedgerError::validation("Stock counts must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Party, Payment, PurchaseLine};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn entry(name: &str, opening: i64, purchased: i64) -> ProductEntry {
        ProductEntry {
            brand: "Acme".into(),
            product_name: name.into(),
            purchase_date: day(1),
            purchase_rate: 100.0,
            margin1: 10.0,
            manual_wholesale: 0.0,
            margin2: 20.0,
            manual_retail: 0.0,
            opening_stock: opening,
            purchased_stock: purchased,
        }
    }

    fn catalog() -> Vec<Product> {
        let mut products = Vec::new();
        StockService::upsert(&mut products, entry("Bulb", 50, 20), day(1)).unwrap();
        StockService::upsert(&mut products, entry("Tube", 5, 0), day(1)).unwrap();
        products
    }

    #[test]
    fn upsert_creates_then_replaces_purchased() {
        let mut products = Vec::new();
        let first = StockService::upsert(&mut products, entry("Bulb", 0, 10), day(1)).unwrap();
        assert!(first.is_created());
        let second = StockService::upsert(&mut products, entry("bulb", 0, 4), day(2)).unwrap();
        assert_eq!(second, UpsertOutcome::Updated(products[0].stock()));
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].purchased_stock, 4);
        assert_eq!(products[0].closing_stock, 4);
    }

    #[test]
    fn upsert_rejects_missing_identity() {
        let mut products = Vec::new();
        let err = StockService::upsert(&mut products, entry(" ", 0, 1), day(1)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(products.is_empty());
    }

    #[test]
    fn receipt_accumulates_and_reports_unmatched() {
        let mut products = catalog();
        let receipt = PurchaseReceipt {
            bill_no: "P0002".into(),
            date: day(3),
            supplier: Party::named("Wholesale Co"),
            payment: Payment::default(),
            lines: vec![
                PurchaseLine {
                    brand: "Acme".into(),
                    product_name: "Bulb".into(),
                    quantity: 5,
                    rate: 95.0,
                },
                PurchaseLine {
                    brand: "Other".into(),
                    product_name: "Fan".into(),
                    quantity: 1,
                    rate: 900.0,
                },
            ],
        };
        let summary = StockService::receive(&mut products, &receipt, day(4)).unwrap();
        assert_eq!(summary.matched, vec!["Bulb".to_string()]);
        assert_eq!(summary.unmatched, vec!["Fan".to_string()]);
        assert_eq!(summary.total, 1375.0);
        let bulb = &products[0];
        assert_eq!(bulb.purchased_stock, 25);
        assert_eq!(bulb.closing_stock, 75);
        assert_eq!(bulb.purchase_rate, 95.0);
        assert_eq!(bulb.purchase_date, day(3));
        assert_eq!(bulb.modified_date, day(4));
    }

    #[test]
    fn sale_and_reversal_keep_identity() {
        let mut products = catalog();
        let key = ProductKey::new("acme", "BULB");
        let line = StockService::sell(&mut products, &key, 5, PriceTier::Retail, day(2)).unwrap();
        assert_eq!(line.rate, 132.0);
        assert_eq!(line.amount, 660.0);
        assert_eq!(products[0].sold_stock, 5);
        assert_eq!(products[0].closing_stock, 65);

        assert!(StockService::unsell(&mut products, &line, day(3)).unwrap());
        assert_eq!(products[0].sold_stock, 0);
        assert_eq!(products[0].closing_stock, 70);
    }

    #[test]
    fn sale_of_unknown_product_fails() {
        let mut products = catalog();
        let key = ProductKey::new("Acme", "Fan");
        let err = StockService::sell(&mut products, &key, 1, PriceTier::Wholesale, day(2)).unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(_)));
    }

    #[test]
    fn oversized_sale_is_rejected_and_leaves_counters_alone() {
        let mut products = catalog();
        let key = ProductKey::new("Acme", "Bulb");
        StockService::sell(&mut products, &key, 1, PriceTier::Retail, day(2)).unwrap();
        let err =
            StockService::sell(&mut products, &key, i64::MAX, PriceTier::Retail, day(3)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(products[0].sold_stock, 1);
        assert_eq!(products[0].closing_stock, 69);
    }

    #[test]
    fn remove_returns_the_record() {
        let mut products = catalog();
        let removed = StockService::remove(&mut products, &ProductKey::new("Acme", "Tube")).unwrap();
        assert_eq!(removed.product_name, "Tube");
        assert_eq!(products.len(), 1);
        assert!(StockService::remove(&mut products, &ProductKey::new("Acme", "Tube")).is_err());
    }
}

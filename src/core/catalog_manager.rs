use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::config::{Config, ConfigManager};
use crate::core::services::{
    RateService, ReceiptSummary, ServiceResult, StockService, UpsertOutcome,
};
use crate::core::time::Clock;
use crate::errors::LedgerError;
use crate::ledger::{
    same_product_name, Bill, BillLine, Checkout, FutureRateChange, PriceTier, Product,
    ProductEntry, ProductKey, PurchaseReceipt, RateEdit, RateQuote, StockSnapshot,
};
use crate::storage::{
    BillCounter, CsvCatalogStore, ProductStore, RateScheduleStore, RecordStore, SweepReport,
};

/// Result of a rate edit: applied to the catalog now, or parked until its
/// effective date.
#[derive(Debug, Clone, PartialEq)]
pub enum RateChangeOutcome {
    Applied(RateQuote),
    Scheduled(FutureRateChange),
}

/// Single owner of the session's product collection and the bill being built.
///
/// Every mutation runs against a clone of the collection and replaces the
/// session state only once the catalog save succeeded.
pub struct CatalogManager {
    products: Vec<Product>,
    bill: Bill,
    store: Box<dyn ProductStore>,
    schedule: RateScheduleStore,
    clock: Box<dyn Clock>,
}

impl CatalogManager {
    /// Loads the catalog and runs the startup sweep. A failing sweep is
    /// logged and left for the next tick.
    pub fn open(
        store: Box<dyn ProductStore>,
        schedule: RateScheduleStore,
        clock: Box<dyn Clock>,
    ) -> Result<(Self, SweepReport), LedgerError> {
        let products = store.load(clock.today())?;
        debug!(products = products.len(), "catalog loaded");
        let mut manager = Self {
            products,
            bill: Bill::default(),
            store,
            schedule,
            clock,
        };
        let report = match manager.sweep_due() {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "startup rate sweep failed");
                SweepReport::default()
            }
        };
        Ok((manager, report))
    }

    /// Opens the CSV catalog and schedule named by `config`.
    pub fn from_config(
        configs: &ConfigManager,
        config: &Config,
        clock: Box<dyn Clock>,
    ) -> Result<(Self, SweepReport), LedgerError> {
        let dir = configs.data_dir(config)?;
        let store = CsvCatalogStore::new(dir.join(&config.catalog_file))
            .with_retention(config.backup_retention);
        let schedule = RateScheduleStore::new(dir.join(&config.schedule_file));
        Self::open(Box::new(store), schedule, clock)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, key: &ProductKey) -> Option<&Product> {
        StockService::find(&self.products, key)
    }

    pub fn stock_of(&self, key: &ProductKey) -> Result<StockSnapshot, LedgerError> {
        self.product(key)
            .map(Product::stock)
            .ok_or_else(|| LedgerError::ProductNotFound(key.to_string()))
    }

    pub fn bill(&self) -> &Bill {
        &self.bill
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn schedule(&self) -> &RateScheduleStore {
        &self.schedule
    }

    /// Replaces the session collection with what is on disk.
    pub fn reload(&mut self) -> Result<usize, LedgerError> {
        self.products = self.store.load(self.clock.today())?;
        info!(products = self.products.len(), "catalog reloaded");
        Ok(self.products.len())
    }

    pub fn upsert_product(&mut self, entry: ProductEntry) -> Result<UpsertOutcome, LedgerError> {
        self.commit("catalog edit", |products, today| {
            StockService::upsert(products, entry, today)
        })
    }

    pub fn receive_purchase(
        &mut self,
        receipt: &PurchaseReceipt,
    ) -> Result<ReceiptSummary, LedgerError> {
        let summary = self.commit("purchase receipt", |products, today| {
            StockService::receive(products, receipt, today)
        })?;
        info!(
            bill_no = %receipt.bill_no,
            matched = summary.matched.len(),
            unmatched = summary.unmatched.len(),
            "purchase receipt recorded"
        );
        Ok(summary)
    }

    /// Sells `quantity` of the product at `tier` and appends the line to the
    /// current bill.
    pub fn add_sale_line(
        &mut self,
        key: &ProductKey,
        quantity: i64,
        tier: PriceTier,
    ) -> Result<BillLine, LedgerError> {
        let line = self.commit("sale", |products, today| {
            StockService::sell(products, key, quantity, tier, today)
        })?;
        self.bill.lines.push(line.clone());
        Ok(line)
    }

    /// Removes a bill line and gives its quantity back to stock.
    pub fn delete_sale_line(&mut self, index: usize) -> Result<BillLine, LedgerError> {
        let line = self
            .bill
            .lines
            .get(index)
            .cloned()
            .ok_or_else(|| LedgerError::InvalidRef(format!("bill line {}", index + 1)))?;
        let key = ProductKey::new(&line.brand, &line.product_name);
        if StockService::find(&self.products, &key).is_some() {
            self.commit("sale reversal", |products, today| {
                StockService::unsell(products, &line, today).map(|_| ())
            })?;
        }
        Ok(self.bill.lines.remove(index))
    }

    pub fn delete_product(&mut self, key: &ProductKey) -> Result<Product, LedgerError> {
        let removed = self.commit("product delete", |products, _| {
            StockService::remove(products, key)
        })?;
        info!(product = %key, "product deleted");
        Ok(removed)
    }

    /// Applies a rate edit now, or schedules it when its effective date is
    /// still ahead.
    pub fn change_rate(&mut self, edit: RateEdit) -> Result<RateChangeOutcome, LedgerError> {
        let today = self.today();
        let change = edit.into_change(today);
        RateService::validate(&change)?;
        if !self
            .products
            .iter()
            .any(|product| same_product_name(&product.product_name, &change.product_name))
        {
            return Err(LedgerError::ProductNotFound(change.product_name));
        }
        if RateService::is_future(&change, today) {
            self.schedule.schedule(change.clone())?;
            return Ok(RateChangeOutcome::Scheduled(change));
        }
        let quote = self.commit("rate change", |products, today| {
            RateService::apply_now(products, &change, today)
        })?;
        Ok(RateChangeOutcome::Applied(quote))
    }

    pub fn current_rate(&self, product_name: &str, on: NaiveDate) -> Result<RateQuote, LedgerError> {
        let pending = self.schedule.load_pending()?;
        RateService::current_rate(&self.products, &pending, product_name, on)
    }

    pub fn pending_changes(&self) -> Result<Vec<FutureRateChange>, LedgerError> {
        self.schedule.load_pending()
    }

    /// Applies every pending change that is due today.
    pub fn sweep_due(&mut self) -> Result<SweepReport, LedgerError> {
        let today = self.today();
        let mut snapshot = self.products.clone();
        let report = self.schedule.sweep(today, &mut snapshot, self.store.as_ref())?;
        if !report.applied.is_empty() {
            self.products = snapshot;
        }
        Ok(report)
    }

    /// Numbers the current bill, writes it to `records` and hands it back,
    /// leaving an empty one. The number is spent only once the file exists.
    pub fn finish_bill(
        &mut self,
        counter: &BillCounter,
        records: &RecordStore,
        checkout: &Checkout,
    ) -> Result<Bill, LedgerError> {
        if self.bill.is_empty() {
            return Err(LedgerError::validation("Bill has no items"));
        }
        checkout.payment.validate()?;
        let today = self.today();
        let (number, _) = counter.issue(|number| {
            let mut numbered = self.bill.clone();
            numbered.number = Some(number.to_string());
            numbered.date = Some(today);
            records.write_bill(&numbered, checkout)
        })?;
        let mut bill = std::mem::take(&mut self.bill);
        bill.number = Some(number);
        bill.date = Some(today);
        info!(bill_no = ?bill.number, lines = bill.lines.len(), "bill finished");
        Ok(bill)
    }

    /// Receives a supplier receipt and records it under `records`.
    ///
    /// With a `counter` the receipt is numbered from it, and the number is
    /// spent only after the catalog commit went through.
    pub fn record_purchase(
        &mut self,
        mut receipt: PurchaseReceipt,
        counter: Option<&BillCounter>,
        records: &RecordStore,
    ) -> Result<(PurchaseReceipt, ReceiptSummary), LedgerError> {
        receipt.payment.validate()?;
        let summary = match counter {
            Some(counter) => {
                let (number, summary) = counter.issue(|number| {
                    let mut numbered = receipt.clone();
                    numbered.bill_no = number.to_string();
                    self.receive_purchase(&numbered)
                })?;
                receipt.bill_no = number;
                summary
            }
            None => {
                if receipt.bill_no.trim().is_empty() {
                    return Err(LedgerError::validation("Bill number is required"));
                }
                self.receive_purchase(&receipt)?
            }
        };
        if let Err(err) = records.append_purchase(&receipt) {
            error!(bill_no = %receipt.bill_no, error = %err, "purchase stock committed but record not written");
            return Err(err);
        }
        Ok((receipt, summary))
    }

    fn commit<T>(
        &mut self,
        action: &str,
        mutate: impl FnOnce(&mut Vec<Product>, NaiveDate) -> ServiceResult<T>,
    ) -> Result<T, LedgerError> {
        let today = self.clock.today();
        let mut snapshot = self.products.clone();
        let value = mutate(&mut snapshot, today)?;
        if !self.store.save(&snapshot) {
            error!(action, "catalog save failed, session state unchanged");
            return Err(LedgerError::Persistence(format!(
                "catalog could not be saved after {action}"
            )));
        }
        self.products = snapshot;
        debug!(action, products = self.products.len(), "catalog committed");
        Ok(value)
    }
}

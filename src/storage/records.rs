use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::LedgerError,
    ledger::{Bill, Checkout, PurchaseReceipt, SalesReceipt},
    utils::paths::{ensure_dir, tmp_path},
};

use super::{catalog::DATE_FORMAT, Result};

const PURCHASES_FILE: &str = "purchases.csv";
const SALES_RECEIPTS_FILE: &str = "sales_receipts.csv";

const BILL_HEADER: [&str; 9] = [
    "Bill No",
    "Date",
    "Customer",
    "Phone",
    "Type",
    "Place",
    "Site",
    "Payment Type",
    "Include GST",
];
const BILL_ITEMS_HEADER: [&str; 6] = ["S.No", "Brand", "Product", "Qty", "Rate", "Amount"];

/// One row of `purchases.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Bill No")]
    pub bill_no: String,
    #[serde(rename = "Place")]
    pub place: String,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Payment Type")]
    pub payment_type: String,
    #[serde(rename = "Items Count")]
    pub items_count: usize,
    #[serde(rename = "Total Purchase")]
    pub total: String,
    #[serde(rename = "Paid")]
    pub paid: String,
    #[serde(rename = "Remaining")]
    pub remaining: String,
}

impl From<&PurchaseReceipt> for PurchaseRecord {
    fn from(receipt: &PurchaseReceipt) -> Self {
        Self {
            date: receipt.date.format(DATE_FORMAT).to_string(),
            supplier: receipt.supplier.name.clone(),
            phone: receipt.supplier.phone.clone(),
            bill_no: receipt.bill_no.clone(),
            place: receipt.supplier.place.clone(),
            site: receipt.supplier.site.clone(),
            payment_type: receipt.payment.payment_type.clone(),
            items_count: receipt.lines.len(),
            total: amount(receipt.total()),
            paid: amount(receipt.payment.amount_paid),
            remaining: amount(receipt.remaining()),
        }
    }
}

/// One row of `purchase_items_<bill>.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseItemRecord {
    #[serde(rename = "Bill No")]
    pub bill_no: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Rate")]
    pub rate: String,
    #[serde(rename = "Total")]
    pub total: String,
}

/// One row of `sales_receipts.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReceiptRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Customer")]
    pub customer: String,
    #[serde(rename = "Amount Received")]
    pub amount_received: String,
    #[serde(rename = "Cash")]
    pub cash: String,
    #[serde(rename = "Cheque")]
    pub cheque: String,
    #[serde(rename = "Bank Transfer")]
    pub bank_transfer: String,
}

impl From<&SalesReceipt> for SalesReceiptRecord {
    fn from(receipt: &SalesReceipt) -> Self {
        Self {
            date: receipt.date.format(DATE_FORMAT).to_string(),
            customer: receipt.customer.trim().to_string(),
            amount_received: amount(receipt.amount()),
            cash: amount(receipt.cash),
            cheque: amount(receipt.cheque),
            bank_transfer: amount(receipt.bank_transfer),
        }
    }
}

/// Finished sale bills, purchase receipts and customer payments, kept as CSV
/// files next to the catalog.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bill_path(&self, bill_no: &str) -> PathBuf {
        self.dir.join(format!("bill_{bill_no}.csv"))
    }

    pub fn purchase_items_path(&self, bill_no: &str) -> PathBuf {
        self.dir.join(format!("purchase_items_{bill_no}.csv"))
    }

    pub fn purchases_path(&self) -> PathBuf {
        self.dir.join(PURCHASES_FILE)
    }

    pub fn sales_receipts_path(&self) -> PathBuf {
        self.dir.join(SALES_RECEIPTS_FILE)
    }

    /// Writes `bill_<no>.csv`: a header block with the customer and payment,
    /// the numbered lines, then total, amount paid and remaining.
    pub fn write_bill(&self, bill: &Bill, checkout: &Checkout) -> Result<PathBuf> {
        let number = bill
            .number
            .as_deref()
            .ok_or_else(|| LedgerError::InvalidRef("bill has no number".into()))?;
        let date = bill
            .date
            .ok_or_else(|| LedgerError::InvalidRef(format!("bill {number} has no date")))?;
        let path = self.bill_path(number);
        ensure_dir(&self.dir)?;
        let tmp = tmp_path(&path);
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;

        let customer = &checkout.customer;
        let date = date.format(DATE_FORMAT).to_string();
        let customer_type = checkout.customer_type.to_string();
        writer.write_record(BILL_HEADER)?;
        writer.write_record([
            number,
            date.as_str(),
            customer.name.trim(),
            customer.phone.trim(),
            customer_type.as_str(),
            customer.place.trim(),
            customer.site.trim(),
            checkout.payment.payment_type.trim(),
            if checkout.include_gst { "Yes" } else { "No" },
        ])?;
        writer.write_record([""])?;
        writer.write_record(BILL_ITEMS_HEADER)?;
        for (index, line) in bill.lines.iter().enumerate() {
            writer.write_record([
                (index + 1).to_string(),
                line.brand.clone(),
                line.product_name.clone(),
                line.quantity.to_string(),
                amount(line.rate),
                amount(line.amount),
            ])?;
        }
        writer.write_record([""])?;
        let totals = [
            ("Total", checkout.total(bill)),
            ("Amount Paid", checkout.payment.amount_paid),
            ("Remaining Amount", checkout.remaining(bill)),
        ];
        for (label, value) in totals {
            let value = amount(value);
            writer.write_record([label, "", "", "", "", value.as_str()])?;
        }
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &path)?;
        info!(bill_no = number, path = %path.display(), "bill saved");
        Ok(path)
    }

    /// Appends the receipt to `purchases.csv` and writes its line items to
    /// `purchase_items_<bill>.csv`.
    pub fn append_purchase(&self, receipt: &PurchaseReceipt) -> Result<()> {
        if receipt.bill_no.trim().is_empty() {
            return Err(LedgerError::InvalidRef("purchase receipt has no bill number".into()));
        }
        let date = receipt.date.format(DATE_FORMAT).to_string();
        let items: Vec<PurchaseItemRecord> = receipt
            .lines
            .iter()
            .map(|line| PurchaseItemRecord {
                bill_no: receipt.bill_no.clone(),
                date: date.clone(),
                supplier: receipt.supplier.name.clone(),
                brand: line.brand.clone(),
                product: line.product_name.clone(),
                quantity: line.quantity,
                rate: amount(line.rate),
                total: amount(line.total()),
            })
            .collect();

        ensure_dir(&self.dir)?;
        let items_path = self.purchase_items_path(receipt.bill_no.trim());
        let tmp = tmp_path(&items_path);
        let mut writer = csv::Writer::from_path(&tmp)?;
        for item in &items {
            writer.serialize(item)?;
        }
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &items_path)?;

        append_rows(&self.purchases_path(), &[PurchaseRecord::from(receipt)])?;
        info!(bill_no = %receipt.bill_no, items = items.len(), "purchase recorded");
        Ok(())
    }

    pub fn load_purchases(&self) -> Result<Vec<PurchaseRecord>> {
        read_rows(&self.purchases_path())
    }

    pub fn load_purchase_items(&self, bill_no: &str) -> Result<Vec<PurchaseItemRecord>> {
        read_rows(&self.purchase_items_path(bill_no.trim()))
    }

    /// Validates and appends a customer payment to `sales_receipts.csv`.
    pub fn append_sales_receipt(&self, receipt: &SalesReceipt) -> Result<SalesReceiptRecord> {
        receipt.validate()?;
        let record = SalesReceiptRecord::from(receipt);
        append_rows(&self.sales_receipts_path(), std::slice::from_ref(&record))?;
        info!(customer = %record.customer, amount = %record.amount_received, "sales receipt recorded");
        Ok(record)
    }

    pub fn load_sales_receipts(&self) -> Result<Vec<SalesReceiptRecord>> {
        read_rows(&self.sales_receipts_path())
    }
}

fn amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Appends `rows`, writing the header only when the file is new or empty.
fn append_rows<R: Serialize>(path: &Path, rows: &[R]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let has_header = fs::metadata(path).map(|meta| meta.len() > 0).unwrap_or(false);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!has_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    if !path.exists() {
        debug!(path = %path.display(), "record file does not exist");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BillLine, Party, Payment, PriceTier, PurchaseLine};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn store() -> (RecordStore, TempDir) {
        let temp = TempDir::new().unwrap();
        (RecordStore::new(temp.path().join("records")), temp)
    }

    fn receipt(bill_no: &str) -> PurchaseReceipt {
        PurchaseReceipt {
            bill_no: bill_no.into(),
            date: day(4),
            supplier: Party {
                name: "Supply House".into(),
                phone: "98400".into(),
                place: "Madurai".into(),
                site: String::new(),
            },
            payment: Payment {
                payment_type: "Credit".into(),
                amount_paid: 500.0,
            },
            lines: vec![
                PurchaseLine {
                    brand: "Acme".into(),
                    product_name: "Bulb".into(),
                    quantity: 6,
                    rate: 95.0,
                },
                PurchaseLine {
                    brand: "Acme".into(),
                    product_name: "Tube".into(),
                    quantity: 2,
                    rate: 40.5,
                },
            ],
        }
    }

    #[test]
    fn bill_file_carries_header_lines_and_balance() {
        let (store, _guard) = store();
        let bill = Bill {
            number: Some("0007".into()),
            date: Some(day(2)),
            lines: vec![BillLine::new("Acme", "Bulb", 2, PriceTier::Retail, 132.0)],
        };
        let checkout = Checkout {
            customer: Party::named("Ravi"),
            payment: Payment {
                payment_type: "UPI".into(),
                amount_paid: 200.0,
            },
            ..Checkout::default()
        };

        let path = store.write_bill(&bill, &checkout).unwrap();
        assert_eq!(path, store.bill_path("0007"));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], BILL_HEADER.join(","));
        assert_eq!(lines[1], "0007,2024-11-02,Ravi,,Retail,,,UPI,Yes");
        assert_eq!(lines[3], BILL_ITEMS_HEADER.join(","));
        assert_eq!(lines[4], "1,Acme,Bulb,2,132.00,264.00");
        assert!(contents.contains("Total,,,,,311.52"));
        assert!(contents.contains("Amount Paid,,,,,200.00"));
        assert!(contents.contains("Remaining Amount,,,,,111.52"));
    }

    #[test]
    fn unnumbered_bill_is_not_written() {
        let (store, _guard) = store();
        let err = store.write_bill(&Bill::default(), &Checkout::default()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRef(_)));
        assert!(!store.dir().exists());
    }

    #[test]
    fn purchases_append_and_keep_item_files_per_bill() {
        let (store, _guard) = store();
        store.append_purchase(&receipt("P0002")).unwrap();
        store.append_purchase(&receipt("P0003")).unwrap();

        let purchases = store.load_purchases().unwrap();
        assert_eq!(purchases.len(), 2);
        assert_eq!(purchases[0].bill_no, "P0002");
        assert_eq!(purchases[0].items_count, 2);
        assert_eq!(purchases[0].total, "651.00");
        assert_eq!(purchases[0].remaining, "151.00");
        assert_eq!(purchases[1].bill_no, "P0003");

        let items = store.load_purchase_items("P0003").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].product, "Tube");
        assert_eq!(items[1].total, "81.00");

        let header = fs::read_to_string(store.purchases_path()).unwrap();
        assert_eq!(header.matches("Bill No").count(), 1);
    }

    #[test]
    fn sales_receipts_are_validated_then_appended() {
        let (store, _guard) = store();
        let mut payment = SalesReceipt {
            date: day(9),
            customer: "Ravi".into(),
            cash: 100.0,
            cheque: 0.0,
            bank_transfer: 250.0,
        };
        let record = store.append_sales_receipt(&payment).unwrap();
        assert_eq!(record.amount_received, "350.00");

        payment.cash = 0.0;
        payment.bank_transfer = 0.0;
        assert!(store.append_sales_receipt(&payment).is_err());
        assert_eq!(store.load_sales_receipts().unwrap(), vec![record]);
    }
}

//! Catalog domain types and the pure rate and stock rules behind them.

pub mod bill;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod rate_change;
pub mod rates;
pub mod stock;

pub use bill::{Bill, BillLine, Checkout, PriceTier, DEFAULT_GST_PERCENT};
pub use payment::{Party, Payment, SalesReceipt};
pub use product::{same_product_name, Product, ProductEntry, ProductKey};
pub use purchase::{PurchaseLine, PurchaseReceipt};
pub use rate_change::{partition_due, FutureRateChange, RateEdit, RateQuote};
pub use rates::{derive_retail, derive_tiers, derive_wholesale, round2};
pub use stock::{clamp_sold, closing_stock, StockSnapshot};

pub mod rate_service;
pub mod stock_service;

pub use rate_service::RateService;
pub use stock_service::{ReceiptSummary, StockService, UpsertOutcome};

use crate::errors::LedgerError;

pub type ServiceResult<T> = Result<T, LedgerError>;

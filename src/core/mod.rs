//! Session-level services: validation, the catalog manager and the sweep scheduler.

pub mod catalog_manager;
pub mod scheduler;
pub mod services;
pub mod time;
pub mod validation;

pub use catalog_manager::{CatalogManager, RateChangeOutcome};
pub use scheduler::RateSweepScheduler;
pub use time::{Clock, FixedClock, SystemClock};

use std::sync::{Arc, Mutex};

use chrono::{Days, Local, NaiveDate};

/// Clock abstracts "today" so ledger dates and sweeps stay deterministic in tests.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock. Clones share the same date, so a test can keep a handle and
/// move time forward after handing the clock to a manager.
#[derive(Debug, Clone)]
pub struct FixedClock {
    date: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Arc::new(Mutex::new(date)),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = date;
    }

    pub fn advance_days(&self, days: u64) {
        let mut guard = self.date.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = guard.checked_add_days(Days::new(days)) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_date() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        let handle = clock.clone();
        handle.advance_days(2);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }
}

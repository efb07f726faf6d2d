//! Fixed-interval driver for the rate sweep.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::core::catalog_manager::CatalogManager;
use crate::storage::SweepReport;

/// Polls the rate schedule on a fixed interval. Runs on the caller's thread,
/// so a sweep never overlaps a catalog mutation.
#[derive(Debug, Clone)]
pub struct RateSweepScheduler {
    interval: Duration,
    last_run: Option<Instant>,
    consecutive_failures: u32,
}

impl RateSweepScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            consecutive_failures: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Marks the startup sweep as done so the next tick waits a full interval.
    pub fn mark_ran(&mut self, now: Instant) {
        self.last_run = Some(now);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Sweeps if the interval has elapsed. Failures are logged and retried on
    /// the next interval.
    pub fn tick(&mut self, manager: &mut CatalogManager, now: Instant) -> Option<SweepReport> {
        if !self.is_due(now) {
            return None;
        }
        self.last_run = Some(now);
        match manager.sweep_due() {
            Ok(report) => {
                self.consecutive_failures = 0;
                if report.is_noop() {
                    debug!(remaining = report.remaining, "rate sweep found nothing due");
                }
                Some(report)
            }
            Err(err) => {
                self.consecutive_failures += 1;
                error!(
                    error = %err,
                    failures = self.consecutive_failures,
                    "rate sweep failed"
                );
                None
            }
        }
    }

    /// Blocks, sweeping once per interval. Stops after `max_ticks` sweeps when
    /// given, otherwise runs until the process exits. Missed intervals are
    /// skipped rather than replayed.
    pub fn run(&mut self, manager: &mut CatalogManager, max_ticks: Option<usize>) -> usize {
        info!(interval_secs = self.interval.as_secs(), "rate sweep scheduler started");
        let mut ticks = 0;
        loop {
            if max_ticks.is_some_and(|limit| ticks >= limit) {
                break;
            }
            let now = Instant::now();
            if self.is_due(now) {
                self.tick(manager, now);
                ticks += 1;
                continue;
            }
            let wait = self
                .last_run
                .map(|last| self.interval.saturating_sub(now.saturating_duration_since(last)))
                .unwrap_or_default();
            thread::sleep(wait);
        }
        info!(ticks, "rate sweep scheduler stopped");
        ticks
    }
}

use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::fees::AccrualSummary;
use crate::marketplace::Marketplace;

/// interval gate for the overdue scan
///
/// The host application drives `run_if_due` from whatever cadence it has
/// (a timer task, a cron tick, a request hook). The scheduler only decides
/// whether enough time has passed since the last run; the scan itself is
/// idempotent, so an extra run is harmless.
pub struct AccrualScheduler {
    interval: Duration,
    last_run: Option<DateTime<Utc>>,
}

impl AccrualScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// scheduler using the marketplace's configured accrual interval
    pub fn for_market(market: &Marketplace) -> Self {
        Self::new(market.config().accrual_interval)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    /// whether a full interval has elapsed since the last run
    pub fn is_due(&self, time_provider: &SafeTimeProvider) -> bool {
        match self.last_run {
            None => true,
            Some(last) => time_provider.now() - last >= self.interval,
        }
    }

    /// run the overdue scan if the interval has elapsed
    pub fn run_if_due(
        &mut self,
        market: &Marketplace,
        time_provider: &SafeTimeProvider,
    ) -> Option<AccrualSummary> {
        if !self.is_due(time_provider) {
            return None;
        }
        Some(self.run_now(market, time_provider))
    }

    /// run the overdue scan unconditionally, resetting the interval
    pub fn run_now(
        &mut self,
        market: &Marketplace,
        time_provider: &SafeTimeProvider,
    ) -> AccrualSummary {
        self.last_run = Some(time_provider.now());
        market.process_overdue_items(time_provider)
    }
}

//! Port interface for daily indicator computations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edumetrics_domain::{DayOutcome, DayWindow, Result};

/// One indicator's daily computation.
///
/// The window is the day being aggregated; the write date is the month
/// anchor stamped on the produced records, so every day of a month
/// accumulates into the same monthly row set.
#[async_trait]
pub trait DayIndicator: Send + Sync {
    /// Indicator name; also the value field on the records it writes.
    fn key(&self) -> &'static str;

    /// Compute one day and upsert the results into the store.
    ///
    /// A source failure skips the day (logged, nothing written); individual
    /// upsert failures are logged and counted but never abort the batch.
    async fn compute_day(&self, window: DayWindow, write_date: DateTime<Utc>)
        -> Result<DayOutcome>;
}

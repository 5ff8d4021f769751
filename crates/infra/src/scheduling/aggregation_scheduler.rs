//! Aggregation scheduler
//!
//! Drives per-day indicator computation: a registered cron job aggregates
//! yesterday every night, `run_range` replays an arbitrary day range, and
//! `regenerate` deletes stored records before recomputing them.
//!
//! Day tasks are dispatched with a small fixed stagger and run detached -
//! they are independent, may finish in any order, and no barrier signals
//! "whole range done". Regeneration is not serialized against concurrent
//! runs; callers needing exclusion must provide it externally.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use edumetrics_core::{DocumentStore, IndicatorRegistry};
//! use edumetrics_infra::scheduling::{AggregationScheduler, AggregationSchedulerConfig};
//!
//! # async fn example(registry: IndicatorRegistry, store: Arc<dyn DocumentStore>) ->
//! #     Result<(), edumetrics_infra::SchedulerError> {
//! let mut scheduler = AggregationScheduler::new(
//!     registry,
//!     store,
//!     AggregationSchedulerConfig::default(),
//! )
//! .await?;
//!
//! scheduler.start().await?;
//! // ... application runs, aggregation fires nightly ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edumetrics_core::stats::ports::DocumentStore;
use edumetrics_core::IndicatorRegistry;
use edumetrics_domain::constants::STATS_COLLECTION;
use edumetrics_domain::utils::dates::{day_start, first_day_of_month, format_store_date};
use edumetrics_domain::DayWindow;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the aggregation scheduler.
#[derive(Debug, Clone)]
pub struct AggregationSchedulerConfig {
    /// Cron expression for the nightly run. Defaults to 01:15 - fire times
    /// between midnight and 1:00 AM can skip or repeat across daylight
    /// savings transitions.
    pub cron_expression: String,
    /// Delay between two day-task dispatches in a range run.
    pub dispatch_stagger: Duration,
    /// Collection holding the stat records (used by regeneration deletes).
    pub stats_collection: String,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for AggregationSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 15 1 * * *".into(), // daily at 01:15
            dispatch_stagger: Duration::from_millis(100),
            stats_collection: STATS_COLLECTION.to_string(),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Nightly aggregation scheduler with explicit lifecycle management.
pub struct AggregationScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: AggregationSchedulerConfig,
    registry: IndicatorRegistry,
    store: Arc<dyn DocumentStore>,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl AggregationScheduler {
    /// Create a scheduler and register the nightly job.
    pub async fn new(
        registry: IndicatorRegistry,
        store: Arc<dyn DocumentStore>,
        config: AggregationSchedulerConfig,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|err| SchedulerError::CreationFailed(err.to_string()))?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            registry,
            store,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
        };

        scheduler.job_id = scheduler.register_nightly_job().await?;
        Ok(scheduler)
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
        .map_err(|err| SchedulerError::StartFailed(err.to_string()))?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Aggregation scheduler monitor cancelled");
        });
        self.monitor_handle = Some(handle);

        info!(cron = %self.config.cron_expression, "Aggregation scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
        .map_err(|err| SchedulerError::StopFailed(err.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Aggregation scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Aggregate yesterday's window, the same dispatch the nightly job runs.
    pub async fn run_daily(&self) {
        dispatch_yesterday(self.registry.clone()).await;
    }

    /// Dispatch one detached day task per day of `[start, end)`, with a
    /// fixed stagger between dispatches. Returns the dispatch count; tasks
    /// complete independently and possibly out of order.
    pub async fn run_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<usize> {
        let mut day = day_start(start);
        let mut dispatched = 0;

        while day < end {
            let window = DayWindow::for_day(day);
            let write_date = first_day_of_month(day);
            let registry = self.registry.clone();
            tokio::spawn(async move {
                run_day(registry, window, write_date).await;
            });
            dispatched += 1;

            tokio::time::sleep(self.config.dispatch_stagger).await;
            day += chrono::Duration::days(1);
        }

        info!(dispatched, %start, %end, "Day-range aggregation dispatched");
        Ok(dispatched)
    }

    /// Delete every stat record dated in `[start, end)` (day-truncated store
    /// boundaries), then recompute the range. Delete-then-rewrite is not
    /// transactional; overlapping regenerations must be serialized by the
    /// caller.
    pub async fn regenerate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<usize> {
        if end <= start {
            return Err(SchedulerError::InvalidRange(format!(
                "end {end} is not after start {start}"
            )));
        }

        let filter = json!({ "$and": [
            { "date": { "$gte": format_store_date(day_start(start)) } },
            { "date": { "$lt": format_store_date(day_start(end)) } },
        ] });
        let deleted = self.store.delete(&self.config.stats_collection, filter).await?;
        info!(deleted, %start, %end, "Deleted stat records for regeneration");

        self.run_range(start, end).await
    }

    async fn register_nightly_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let cron_expr = self.config.cron_expression.clone();
        let registry = self.registry.clone();

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let registry = registry.clone();
            Box::pin(async move {
                dispatch_yesterday(registry).await;
            })
        })
        .map_err(|err| SchedulerError::JobRegistrationFailed(err.to_string()))?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|err| SchedulerError::JobRegistrationFailed(err.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered nightly aggregation job");
        Ok(job_id)
    }
}

/// Ensure the monitor task is cancelled when dropped.
impl Drop for AggregationScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AggregationScheduler dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}

/// Yesterday's window, anchored on the first day of its month.
async fn dispatch_yesterday(registry: IndicatorRegistry) {
    let yesterday = day_start(Utc::now() - chrono::Duration::days(1));
    let window = DayWindow::for_day(yesterday);
    let write_date = first_day_of_month(yesterday);
    info!(day = %window.start, "Nightly aggregation triggered");
    run_day(registry, window, write_date).await;
}

/// Run every registered indicator for one day window. Indicator failures
/// are logged and never abort the remaining indicators.
async fn run_day(registry: IndicatorRegistry, window: DayWindow, write_date: DateTime<Utc>) {
    for indicator in registry.iter() {
        match indicator.compute_day(window, write_date).await {
            Ok(outcome) => {
                debug!(indicator = indicator.key(), ?outcome, "Indicator day finished");
            }
            Err(err) => {
                error!(indicator = indicator.key(), error = %err, "Indicator day failed");
            }
        }
    }
}

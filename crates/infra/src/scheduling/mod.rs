//! Scheduling infrastructure for the nightly aggregation
//!
//! One scheduler with explicit lifecycle management (start/stop), a tracked
//! monitor handle, and cancellation-token support. The nightly trigger is a
//! registered cron job; day-range runs and regeneration are direct calls.

pub mod aggregation_scheduler;
pub mod error;

pub use aggregation_scheduler::{AggregationScheduler, AggregationSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};

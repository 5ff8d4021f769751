//! Scheduler error types

use std::time::Duration;

use edumetrics_domain::StatsError;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("scheduler not running")]
    NotRunning,

    /// Failed to create the underlying job scheduler
    #[error("failed to create scheduler: {0}")]
    CreationFailed(String),

    /// Failed to start the scheduler
    #[error("failed to start scheduler: {0}")]
    StartFailed(String),

    /// Failed to stop the scheduler
    #[error("failed to stop scheduler: {0}")]
    StopFailed(String),

    /// Failed to register the nightly job
    #[error("failed to register job: {0}")]
    JobRegistrationFailed(String),

    /// Regeneration called with an empty or inverted range
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Operation timed out
    #[error("operation timed out after {duration:?}")]
    Timeout {
        duration: Duration,
        #[source]
        source: Elapsed,
    },

    /// Task join failed
    #[error("task join failed: {0}")]
    Join(#[from] JoinError),

    /// Store operation failed
    #[error("store operation failed: {0}")]
    Store(#[from] StatsError),
}

impl From<SchedulerError> for StatsError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidRange(message) => StatsError::InvalidDateRange(message),
            SchedulerError::Store(inner) => inner,
            other => StatsError::Internal(other.to_string()),
        }
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

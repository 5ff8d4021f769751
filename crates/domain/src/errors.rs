//! Error types used throughout the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for edumetrics
///
/// Validation variants are raised before any backend call and are never
/// retried. `Backend` wraps the raw payload of a failed store/index call;
/// `Formatting` means the backend answered with a shape the result walker
/// could not decode, in which case the whole call fails (no partial rows).
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StatsError {
    #[error("structure scope is empty")]
    EmptyScope,

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("backend query failed: {0}")]
    Backend(String),

    #[error("malformed aggregation result: {0}")]
    Formatting(String),

    #[error("graph query failed: {0}")]
    Graph(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for edumetrics operations
pub type Result<T> = std::result::Result<T, StatsError>;

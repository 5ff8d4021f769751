//! Normalized query request
//!
//! A `StatsQuery` is the backend-independent description of one statistics
//! lookup. It is validated at construction so both adapters can assume a
//! well-formed request and reject nothing but scope problems themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StatsError};
use crate::types::Indicator;

/// Half-open date interval `[start, end)`.
///
/// Zero-length and inverted intervals are rejected: an empty window can
/// never produce rows and always signals a caller bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(StatsError::InvalidDateRange(format!(
                "end {end} is not after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from epoch-millisecond bounds, as received from callers.
    pub fn from_millis(start: i64, end: i64) -> Result<Self> {
        let start = DateTime::<Utc>::from_timestamp_millis(start)
            .ok_or_else(|| StatsError::InvalidDateRange(format!("bad start timestamp {start}")))?;
        let end = DateTime::<Utc>::from_timestamp_millis(end)
            .ok_or_else(|| StatsError::InvalidDateRange(format!("bad end timestamp {end}")))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Normalized statistics request.
///
/// The structure scope travels alongside the query as a separate non-empty
/// id list; everything else a lookup needs is here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsQuery {
    pub indicator: Indicator,
    pub range: DateRange,
    module: Option<String>,
    device: Option<String>,
}

impl StatsQuery {
    pub fn new(indicator: Indicator, range: DateRange) -> Self {
        Self { indicator, range, module: None, device: None }
    }

    /// Narrow a module-scoped indicator to one module. Blank values are
    /// treated as absent, matching the "all modules" request shape.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        let module = module.into();
        let trimmed = module.trim();
        self.module = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        self
    }

    /// Device segment requested by the caller. Accepted for interface
    /// compatibility; neither backend currently applies it.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        let device = device.into();
        let trimmed = device.trim();
        self.device = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        self
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// The service-access indicator with no module narrows to a per-module
    /// breakdown instead of a time trend in display mode.
    pub fn is_access_all_modules(&self) -> bool {
        self.indicator == Indicator::Access && self.module.is_none()
    }
}

//! Stored aggregate rows and nightly computation windows

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::GroupBy;
use crate::utils::dates::day_start;

/// One stored aggregate row (document store, collection "stats").
///
/// The composite key is (date, groupedBy, structures_id, profil_id,
/// module_id); at most one record exists per key - every write is an upsert.
/// Indicator values are kept flattened so one record can carry any mix of
/// numeric indicator fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    /// Day-truncated store date string, "yyyy-MM-dd 00:00.00.000"
    pub date: String,

    #[serde(rename = "groupedBy")]
    pub grouped_by: GroupBy,

    #[serde(rename = "structures_id")]
    pub structure_id: String,

    #[serde(rename = "profil_id")]
    pub profile_id: String,

    #[serde(rename = "module_id", skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,

    /// Numeric indicator fields (`CONNEXION`, `accounts`, ...)
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

/// Half-open day window `[start, end)` handed to indicator computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The window covering the day containing `day`.
    pub fn for_day(day: DateTime<Utc>) -> Self {
        let start = day_start(day);
        Self { start, end: start + Duration::days(1) }
    }
}

/// Outcome of one indicator's daily computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// Nothing written: the source yielded no rows or failed outright.
    Skipped,
    /// Upserts were submitted; failures are counted, not retried.
    Written { rows: usize, failures: usize },
}

//! Engine configuration
//!
//! Immutable startup configuration shared by the query planners and the
//! nightly aggregation. Loading it from the process configuration is the
//! embedding application's concern; this crate only defines the shape and
//! sensible defaults.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{EVENTS_INDEX, STATS_COLLECTION};

/// Configuration for the statistics engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Document-store collection holding aggregated stat records
    pub stats_collection: String,

    /// Search index holding raw behavioral events
    pub events_index: String,

    /// Timezone used to label month buckets on the search-index path.
    /// `None` keeps bucket labels in UTC.
    pub timezone: Option<Tz>,

    /// Module ids accepted by the service-access indicator
    pub access_modules: Vec<String>,

    /// Connector ids accepted by the connector indicator
    pub connectors: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            stats_collection: STATS_COLLECTION.to_string(),
            events_index: EVENTS_INDEX.to_string(),
            timezone: None,
            access_modules: Vec::new(),
            connectors: Vec::new(),
        }
    }
}

impl StatsConfig {
    /// Timezone for bucket labels, defaulting to UTC.
    pub fn display_timezone(&self) -> Tz {
        self.timezone.unwrap_or(chrono_tz::UTC)
    }
}

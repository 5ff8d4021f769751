//! Wire-format constants
//!
//! Field names of stored aggregate rows and of the behavioral event
//! documents, shared by both backend adapters and the nightly indicators.

// Stored aggregate rows (document store, collection "stats")
pub const FIELD_DATE: &str = "date";
pub const FIELD_GROUPED_BY: &str = "groupedBy";
pub const FIELD_PROFILE_ID: &str = "profil_id";
pub const FIELD_STRUCTURES_ID: &str = "structures_id";
pub const FIELD_MODULE_ID: &str = "module_id";
pub const FIELD_ACCOUNTS: &str = "accounts";
pub const FIELD_ACTIVATED_ACCOUNTS: &str = "activatedAccounts";

// Export rows carry the summed value under an indicator-agnostic name
pub const FIELD_INDICATOR_VALUE: &str = "indicatorValue";

// Behavioral event documents (search index)
pub const EVENT_FIELD_TYPE: &str = "event-type";
pub const EVENT_FIELD_DATE: &str = "date";
pub const EVENT_FIELD_USER: &str = "userId";
pub const EVENT_FIELD_PROFILE: &str = "profil";
pub const EVENT_FIELD_MODULE: &str = "module";
pub const EVENT_FIELD_STRUCTURES: &str = "structures";

// Defaults for the backing stores
pub const STATS_COLLECTION: &str = "stats";
pub const EVENTS_INDEX: &str = "events";

/// Precision threshold of the approximate distinct-count aggregation.
/// Counts below this are exact in practice; above it the estimator's
/// documented error bound applies.
pub const CARDINALITY_PRECISION_THRESHOLD: u32 = 5000;

/// Stored date strings keep `yyyy-MM` as their first seven characters.
pub const EXPORT_MONTH_LEN: usize = 7;

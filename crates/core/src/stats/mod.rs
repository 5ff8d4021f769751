//! Statistics query planning and result shaping
//!
//! One `StatisticsService` contract, two backend adapters. The adapters are
//! selected once at startup; callers never branch on which backend is active.

pub mod document;
pub mod ports;
pub mod search;
pub mod shape;

pub use document::DocumentStatisticsService;
pub use ports::{DocumentStore, GraphSource, SearchIndex, StatisticsService};
pub use search::SearchStatisticsService;

use edumetrics_domain::{Indicator, Result, StatsConfig, StatsError, StatsQuery};
use serde_json::{Map, Value};
use tracing::error;

/// Build a JSON object from field-name/value pairs. Query descriptors need
/// computed keys (indicator field names), which the `json!` macro cannot
/// express.
pub(crate) fn obj<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Object(Map::from_iter(entries.into_iter().map(|(key, value)| (key.to_string(), value))))
}

pub(crate) fn log_backend(err: StatsError) -> StatsError {
    error!(error = %err, "statistics backend query failed");
    err
}

pub(crate) fn log_formatting(err: StatsError) -> StatsError {
    error!(error = %err, "failed to format aggregation result");
    err
}

/// Reject malformed requests before any backend call.
///
/// Scope must be non-empty; a module narrowing an access/connector query must
/// come from the configured catalog. Date-range validity is enforced at
/// `DateRange` construction, unknown indicators at `Indicator` parse time.
pub(crate) fn validate_request(
    structures: &[String],
    query: &StatsQuery,
    config: &StatsConfig,
) -> Result<()> {
    if structures.is_empty() {
        return Err(StatsError::EmptyScope);
    }
    if let Some(module) = query.module() {
        let catalog = match query.indicator {
            Indicator::Access => &config.access_modules,
            Indicator::Connector => &config.connectors,
            _ => return Ok(()),
        };
        if !catalog.iter().any(|known| known == module) {
            return Err(StatsError::UnknownModule(module.to_string()));
        }
    }
    Ok(())
}

//! Port interfaces for the external collaborators
//!
//! The concrete clients (document-store driver, search-index client, graph
//! query executor) live outside this workspace; the engine consumes them
//! through these traits and is handed constructed instances at startup.

use async_trait::async_trait;
use edumetrics_domain::{DisplayRow, ExportRow, Result, StatsQuery};
use serde_json::Value;

/// Document database holding the aggregated stat records.
///
/// Filters, sorts, projections and pipelines are JSON descriptors in the
/// store's native query language; documents come back as JSON values.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Filtered, sorted, projected lookup.
    async fn find(
        &self,
        collection: &str,
        filter: Value,
        sort: Value,
        projection: Value,
    ) -> Result<Vec<Value>>;

    /// Run a multi-stage aggregation pipeline.
    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>>;

    /// Update the single document matching `filter`, inserting it when
    /// absent. All stat-record writes go through this.
    async fn upsert(&self, collection: &str, filter: Value, update: Value) -> Result<()>;

    /// Delete every document matching `filter`, returning the count removed.
    async fn delete(&self, collection: &str, filter: Value) -> Result<u64>;
}

/// Search engine indexing the raw behavioral events.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Execute a search body and return the raw response tree
    /// (hits are not requested; only aggregations are read).
    async fn search(&self, index: &str, body: Value) -> Result<Value>;
}

/// Graph database answering account/structure queries.
///
/// Used only by the nightly indicator computation.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Execute a graph query and return its rows as field mappings.
    async fn execute(&self, query: &str, params: Value) -> Result<Vec<Value>>;
}

/// Backend-independent statistics contract.
///
/// Both adapters return rows with identical field names, granularity and
/// sort order for identical semantic input - the serving and export layers
/// are written against this contract alone.
#[async_trait]
pub trait StatisticsService: Send + Sync {
    /// Rows for interactive display.
    async fn get_stats(&self, structures: &[String], query: &StatsQuery)
        -> Result<Vec<DisplayRow>>;

    /// Flattened rows for bulk export.
    async fn get_stats_for_export(
        &self,
        structures: &[String],
        query: &StatsQuery,
    ) -> Result<Vec<ExportRow>>;
}

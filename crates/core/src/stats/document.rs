//! Document-store query planner
//!
//! Builds either a direct filtered lookup or a multi-stage grouping pipeline
//! against the stored aggregate rows, depending on indicator and mode. Query
//! descriptors are built by pure functions from the request value; the
//! store client only ever sees immutable JSON.

use std::sync::Arc;

use async_trait::async_trait;
use edumetrics_domain::constants::{
    EXPORT_MONTH_LEN, FIELD_ACCOUNTS, FIELD_DATE, FIELD_GROUPED_BY, FIELD_INDICATOR_VALUE,
    FIELD_MODULE_ID, FIELD_PROFILE_ID, FIELD_STRUCTURES_ID,
};
use edumetrics_domain::utils::dates::format_store_date;
use edumetrics_domain::{DisplayRow, ExportRow, Indicator, Result, StatsConfig, StatsQuery};
use serde_json::{json, Map, Value};

use super::ports::{DocumentStore, StatisticsService};
use super::{log_backend, log_formatting, obj, shape, validate_request};

/// Statistics adapter backed by the document store.
pub struct DocumentStatisticsService {
    store: Arc<dyn DocumentStore>,
    config: StatsConfig,
}

impl DocumentStatisticsService {
    pub fn new(store: Arc<dyn DocumentStore>, config: StatsConfig) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl StatisticsService for DocumentStatisticsService {
    async fn get_stats(
        &self,
        structures: &[String],
        query: &StatsQuery,
    ) -> Result<Vec<DisplayRow>> {
        validate_request(structures, query, &self.config)?;

        let docs = if use_direct_lookup(structures, query) {
            self.store
                .find(
                    &self.config.stats_collection,
                    match_criteria(structures, query),
                    find_sort(),
                    find_projection(query.indicator),
                )
                .await
                .map_err(log_backend)?
        } else {
            self.store
                .aggregate(&self.config.stats_collection, build_pipeline(structures, query, false))
                .await
                .map_err(log_backend)?
        };

        let mut rows =
            shape::display_rows_from_documents(docs, query.indicator).map_err(log_formatting)?;
        shape::sort_display_rows(&mut rows);
        Ok(rows)
    }

    async fn get_stats_for_export(
        &self,
        structures: &[String],
        query: &StatsQuery,
    ) -> Result<Vec<ExportRow>> {
        validate_request(structures, query, &self.config)?;

        let docs = self
            .store
            .aggregate(&self.config.stats_collection, build_pipeline(structures, query, true))
            .await
            .map_err(log_backend)?;

        let mut rows = shape::export_rows_from_documents(docs).map_err(log_formatting)?;
        shape::sort_export_rows(&mut rows);
        Ok(rows)
    }
}

/// Stored rows already have display granularity for a single structure, so a
/// plain lookup suffices - unless the request is the per-module breakdown,
/// which still needs grouping across modules.
fn use_direct_lookup(structures: &[String], query: &StatsQuery) -> bool {
    structures.len() == 1 && !query.is_access_all_modules()
}

/// Filter matching the stored rows the request is allowed to see.
pub(crate) fn match_criteria(structures: &[String], query: &StatsQuery) -> Value {
    let indicator = query.indicator;
    let mut clauses = vec![
        obj([(FIELD_GROUPED_BY, Value::from(indicator.group_by().as_str()))]),
        obj([(FIELD_DATE, json!({ "$gte": format_store_date(query.range.start()) }))]),
        obj([(FIELD_DATE, json!({ "$lt": format_store_date(query.range.end()) }))]),
        obj([(indicator.field(), json!({ "$exists": true }))]),
    ];
    if indicator.is_module_scoped() {
        if let Some(module) = query.module() {
            clauses.push(obj([(FIELD_MODULE_ID, Value::from(module))]));
        }
    }
    if structures.len() == 1 {
        clauses.push(obj([(FIELD_STRUCTURES_ID, Value::from(structures[0].as_str()))]));
    } else {
        clauses.push(obj([(FIELD_STRUCTURES_ID, json!({ "$in": structures }))]));
    }
    json!({ "$and": clauses })
}

fn find_sort() -> Value {
    obj([(FIELD_DATE, Value::from(1)), (FIELD_PROFILE_ID, Value::from(1))])
}

fn find_projection(indicator: Indicator) -> Value {
    let mut projection = Map::new();
    projection.insert("_id".to_string(), Value::from(0));
    projection.insert(indicator.field().to_string(), Value::from(1));
    projection.insert(FIELD_PROFILE_ID.to_string(), Value::from(1));
    projection.insert(FIELD_DATE.to_string(), Value::from(1));
    if indicator.tracks_accounts() {
        projection.insert(FIELD_ACCOUNTS.to_string(), Value::from(1));
    }
    Value::Object(projection)
}

/// Grouping pipeline for multi-structure, breakdown and export requests.
pub(crate) fn build_pipeline(structures: &[String], query: &StatsQuery, export: bool) -> Vec<Value> {
    let indicator = query.indicator;
    let mut stages = vec![json!({ "$match": match_criteria(structures, query) })];

    // Group key: profile plus the mode's leading dimension. The per-module
    // breakdown reports totals, not a time trend, so it drops the date.
    let mut id = Map::new();
    id.insert(FIELD_PROFILE_ID.to_string(), path(FIELD_PROFILE_ID));
    if !export && query.is_access_all_modules() {
        id.insert(FIELD_MODULE_ID.to_string(), path(FIELD_MODULE_ID));
    } else {
        id.insert(FIELD_DATE.to_string(), path(FIELD_DATE));
    }
    if export {
        id.insert(FIELD_STRUCTURES_ID.to_string(), path(FIELD_STRUCTURES_ID));
        if indicator.is_module_scoped() {
            id.insert(FIELD_MODULE_ID.to_string(), path(FIELD_MODULE_ID));
        }
    }

    let mut group = Map::new();
    group.insert("_id".to_string(), Value::Object(id));
    group.insert(indicator.field().to_string(), json!({ "$sum": path(indicator.field()) }));
    if indicator.tracks_accounts() {
        group.insert(FIELD_ACCOUNTS.to_string(), json!({ "$sum": path(FIELD_ACCOUNTS) }));
    }
    stages.push(json!({ "$group": group }));

    // Projection unwraps the group key; export flattens to the
    // indicator-agnostic shape and truncates dates to year-month.
    let mut projection = Map::new();
    projection.insert("_id".to_string(), Value::from(0));
    projection.insert(FIELD_PROFILE_ID.to_string(), id_path(FIELD_PROFILE_ID));
    if indicator.tracks_accounts() {
        projection.insert(FIELD_ACCOUNTS.to_string(), Value::from(1));
    }
    if !export {
        projection.insert(indicator.field().to_string(), Value::from(1));
        if query.is_access_all_modules() {
            projection.insert(FIELD_MODULE_ID.to_string(), id_path(FIELD_MODULE_ID));
        } else {
            projection.insert(FIELD_DATE.to_string(), id_path(FIELD_DATE));
        }
        stages.push(json!({ "$project": projection }));
    } else {
        projection.insert(
            FIELD_DATE.to_string(),
            json!({ "$substr": [id_path(FIELD_DATE), 0, EXPORT_MONTH_LEN] }),
        );
        projection.insert(FIELD_INDICATOR_VALUE.to_string(), path(indicator.field()));
        projection.insert(FIELD_STRUCTURES_ID.to_string(), id_path(FIELD_STRUCTURES_ID));
        if indicator.is_module_scoped() {
            projection.insert(FIELD_MODULE_ID.to_string(), id_path(FIELD_MODULE_ID));
        }
        stages.push(json!({ "$project": projection }));

        let mut sort = Map::new();
        sort.insert(FIELD_STRUCTURES_ID.to_string(), Value::from(1));
        sort.insert(FIELD_DATE.to_string(), Value::from(1));
        sort.insert(FIELD_PROFILE_ID.to_string(), Value::from(1));
        if indicator.is_module_scoped() && query.module().is_none() {
            sort.insert(FIELD_MODULE_ID.to_string(), Value::from(1));
        }
        stages.push(json!({ "$sort": sort }));
    }

    stages
}

fn path(field: &str) -> Value {
    Value::from(format!("${field}"))
}

fn id_path(field: &str) -> Value {
    Value::from(format!("$_id.{field}"))
}

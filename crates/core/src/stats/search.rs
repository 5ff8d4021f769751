//! Search-index query planner
//!
//! Builds a boolean filter plus a nested aggregation tree over the raw
//! behavioral events and walks the response into the same canonical rows as
//! the document-store adapter. Event documents are month-bucketed at query
//! time, so no precomputed rows are needed on this path.

use std::sync::Arc;

use async_trait::async_trait;
use edumetrics_domain::constants::{
    CARDINALITY_PRECISION_THRESHOLD, EVENT_FIELD_DATE, EVENT_FIELD_MODULE, EVENT_FIELD_PROFILE,
    EVENT_FIELD_STRUCTURES, EVENT_FIELD_TYPE, EVENT_FIELD_USER, FIELD_ACCOUNTS,
    FIELD_ACTIVATED_ACCOUNTS,
};
use edumetrics_domain::{DisplayRow, ExportRow, Indicator, Result, StatsConfig, StatsQuery};
use serde_json::{json, Value};

use super::ports::{SearchIndex, StatisticsService};
use super::{log_backend, log_formatting, obj, shape, validate_request};

/// Statistics adapter backed by the search index.
pub struct SearchStatisticsService {
    index: Arc<dyn SearchIndex>,
    config: StatsConfig,
}

impl SearchStatisticsService {
    pub fn new(index: Arc<dyn SearchIndex>, config: StatsConfig) -> Self {
        Self { index, config }
    }
}

#[async_trait]
impl StatisticsService for SearchStatisticsService {
    async fn get_stats(
        &self,
        structures: &[String],
        query: &StatsQuery,
    ) -> Result<Vec<DisplayRow>> {
        validate_request(structures, query, &self.config)?;

        let body = build_search_body(structures, query, false, &self.config);
        let response =
            self.index.search(&self.config.events_index, body).await.map_err(log_backend)?;

        let mut rows = shape::display_rows_from_search(
            &response,
            query.indicator,
            module_breakdown(query, false),
            self.config.display_timezone(),
        )
        .map_err(log_formatting)?;
        shape::sort_display_rows(&mut rows);
        Ok(rows)
    }

    async fn get_stats_for_export(
        &self,
        structures: &[String],
        query: &StatsQuery,
    ) -> Result<Vec<ExportRow>> {
        validate_request(structures, query, &self.config)?;

        let body = build_search_body(structures, query, true, &self.config);
        let response =
            self.index.search(&self.config.events_index, body).await.map_err(log_backend)?;

        let mut rows = shape::export_rows_from_search(
            &response,
            query.indicator,
            module_breakdown(query, true),
            structures,
            query.module(),
            self.config.display_timezone(),
        )
        .map_err(log_formatting)?;
        shape::sort_export_rows(&mut rows);
        Ok(rows)
    }
}

/// Whether the response is broken down per module. Display mode only does
/// this for the "access, all modules" case (totals instead of a time
/// trend); export mode keeps the time axis and adds the module dimension
/// for any module-scoped indicator queried without a module filter.
pub(crate) fn module_breakdown(query: &StatsQuery, export: bool) -> bool {
    if export {
        query.indicator.is_module_scoped() && query.module().is_none()
    } else {
        query.is_access_all_modules()
    }
}

/// Build the full search body: bool filter plus aggregation tree.
pub(crate) fn build_search_body(
    structures: &[String],
    query: &StatsQuery,
    export: bool,
    config: &StatsConfig,
) -> Value {
    let indicator = query.indicator;

    let mut filter = Vec::new();
    if indicator.is_module_scoped() {
        if let Some(module) = query.module() {
            filter.push(term(EVENT_FIELD_MODULE, Value::from(module)));
        }
    }
    filter.push(term(EVENT_FIELD_TYPE, Value::from(indicator.event_type())));
    if structures.len() == 1 {
        filter.push(term(EVENT_FIELD_STRUCTURES, Value::from(structures[0].as_str())));
    } else {
        filter.push(json!({ "terms": obj([(EVENT_FIELD_STRUCTURES, json!(structures))]) }));
    }
    filter.push(json!({ "range": obj([(
        EVENT_FIELD_DATE,
        json!({ "gte": query.range.start_millis(), "lt": query.range.end_millis() }),
    )]) }));

    // Profile buckets, with the indicator's value aggregation nested inside.
    let mut group_by = json!({ "terms": obj([("field", Value::from(EVENT_FIELD_PROFILE))]) });
    match indicator {
        Indicator::UniqueVisitors => {
            group_by["aggs"] = json!({ "unique_count": { "cardinality": obj([
                ("field", Value::from(EVENT_FIELD_USER)),
                ("precision_threshold", Value::from(CARDINALITY_PRECISION_THRESHOLD)),
            ]) } });
        }
        Indicator::ActivatedAccounts => {
            group_by["aggs"] = json!({
                "activated_accounts": { "sum": obj([("field", Value::from(FIELD_ACTIVATED_ACCOUNTS))]) },
                "accounts": { "sum": obj([("field", Value::from(FIELD_ACCOUNTS))]) },
            });
        }
        _ => {
            if export && module_breakdown(query, true) {
                group_by["aggs"] = json!({
                    "per_module": { "terms": obj([("field", Value::from(EVENT_FIELD_MODULE))]) }
                });
            }
        }
    }

    let per_month = if !export && module_breakdown(query, false) {
        // Per-module totals: module buckets replace the month histogram.
        json!({
            "terms": obj([("field", Value::from(EVENT_FIELD_MODULE))]),
            "aggs": { "group_by": group_by },
        })
    } else {
        let mut histogram =
            json!({ "field": EVENT_FIELD_DATE, "interval": "month" });
        if let Some(tz) = config.timezone {
            histogram["time_zone"] = Value::from(tz.name());
        }
        json!({ "date_histogram": histogram, "aggs": { "group_by": group_by } })
    };

    let mut body = json!({ "size": 0, "query": { "bool": { "filter": filter } } });
    if export {
        // Every row must be attributable to its owning structure.
        body["aggs"] = json!({ "per_structure": {
            "terms": obj([
                ("field", Value::from(EVENT_FIELD_STRUCTURES)),
                ("size", Value::from(structures.len())),
            ]),
            "aggs": { "per_month": per_month },
        } });
    } else {
        body["aggs"] = json!({ "per_month": per_month });
    }
    body
}

fn term(field: &str, value: Value) -> Value {
    json!({ "term": obj([(field, value)]) })
}

#[cfg(test)]
mod tests {
    use chrono_tz::Tz;
    use edumetrics_domain::DateRange;

    use super::*;

    fn range() -> DateRange {
        DateRange::from_millis(1_704_067_200_000, 1_706_745_600_000).unwrap() // Jan 2024
    }

    fn scope(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn filters(body: &Value) -> &Vec<Value> {
        body["query"]["bool"]["filter"].as_array().unwrap()
    }

    #[test]
    fn filter_carries_event_type_scope_and_range() {
        let query = StatsQuery::new(Indicator::Connexion, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        let filter = filters(&body);
        assert_eq!(filter[0]["term"]["event-type"], "CONNEXION");
        assert_eq!(filter[1]["term"]["structures"], "S1");
        assert_eq!(filter[2]["range"]["date"]["gte"], 1_704_067_200_000_i64);
        assert_eq!(filter[2]["range"]["date"]["lt"], 1_706_745_600_000_i64);
    }

    #[test]
    fn many_structures_use_a_terms_filter() {
        let query = StatsQuery::new(Indicator::Connexion, range());
        let body = build_search_body(&scope(&["S1", "S2"]), &query, false, &StatsConfig::default());
        let filter = filters(&body);
        assert_eq!(filter[1]["terms"]["structures"], json!(["S1", "S2"]));
    }

    #[test]
    fn unique_visitors_nest_a_bounded_cardinality() {
        let query = StatsQuery::new(Indicator::UniqueVisitors, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        // Unique visitors are counted over login events.
        assert_eq!(filters(&body)[0]["term"]["event-type"], "CONNEXION");
        let unique =
            &body["aggs"]["per_month"]["aggs"]["group_by"]["aggs"]["unique_count"]["cardinality"];
        assert_eq!(unique["field"], "userId");
        assert_eq!(unique["precision_threshold"], 5000);
    }

    #[test]
    fn activated_accounts_sum_both_fields() {
        let query = StatsQuery::new(Indicator::ActivatedAccounts, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        assert_eq!(filters(&body)[0]["term"]["event-type"], "accounts");
        let aggs = &body["aggs"]["per_month"]["aggs"]["group_by"]["aggs"];
        assert_eq!(aggs["activated_accounts"]["sum"]["field"], "activatedAccounts");
        assert_eq!(aggs["accounts"]["sum"]["field"], "accounts");
    }

    #[test]
    fn access_with_module_filters_instead_of_grouping() {
        let query = StatsQuery::new(Indicator::Access, range()).with_module("Blog");
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        let filter = filters(&body);
        assert_eq!(filter[0]["term"]["module"], "Blog");
        assert_eq!(filter[1]["term"]["event-type"], "ACCESS");
        // Month histogram stays; no module aggregation anywhere.
        assert!(body["aggs"]["per_month"].get("date_histogram").is_some());
        assert!(body["aggs"]["per_month"]["aggs"]["group_by"].get("aggs").is_none());
    }

    #[test]
    fn access_all_modules_display_replaces_the_histogram() {
        let query = StatsQuery::new(Indicator::Access, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        let per_month = &body["aggs"]["per_month"];
        assert!(per_month.get("date_histogram").is_none());
        assert_eq!(per_month["terms"]["field"], "module");
        assert_eq!(per_month["aggs"]["group_by"]["terms"]["field"], "profil");
    }

    #[test]
    fn access_all_modules_export_keeps_the_time_axis() {
        let query = StatsQuery::new(Indicator::Access, range());
        let body = build_search_body(&scope(&["S1", "S2"]), &query, true, &StatsConfig::default());
        let per_structure = &body["aggs"]["per_structure"];
        assert_eq!(per_structure["terms"]["field"], "structures");
        assert_eq!(per_structure["terms"]["size"], 2);
        let per_month = &per_structure["aggs"]["per_month"];
        assert!(per_month.get("date_histogram").is_some());
        let group_by = &per_month["aggs"]["group_by"];
        assert_eq!(group_by["aggs"]["per_module"]["terms"]["field"], "module");
    }

    #[test]
    fn connector_matches_the_document_adapter_semantics() {
        // No module: time trend summed across connectors, module dimension
        // only in export.
        let query = StatsQuery::new(Indicator::Connector, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        assert_eq!(filters(&body)[0]["term"]["event-type"], "CONNECTOR");
        assert!(body["aggs"]["per_month"].get("date_histogram").is_some());

        let body = build_search_body(&scope(&["S1"]), &query, true, &StatsConfig::default());
        let group_by = &body["aggs"]["per_structure"]["aggs"]["per_month"]["aggs"]["group_by"];
        assert_eq!(group_by["aggs"]["per_module"]["terms"]["field"], "module");

        // With a module: plain term filter.
        let query = StatsQuery::new(Indicator::Connector, range()).with_module("Pronote");
        let body = build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        assert_eq!(filters(&body)[0]["term"]["module"], "Pronote");
    }

    #[test]
    fn histogram_buckets_in_the_configured_timezone() {
        let config = StatsConfig {
            timezone: Some("Europe/Paris".parse::<Tz>().unwrap()),
            ..StatsConfig::default()
        };
        let query = StatsQuery::new(Indicator::Connexion, range());
        let body = build_search_body(&scope(&["S1"]), &query, false, &config);
        assert_eq!(body["aggs"]["per_month"]["date_histogram"]["time_zone"], "Europe/Paris");

        let body =
            build_search_body(&scope(&["S1"]), &query, false, &StatsConfig::default());
        assert!(body["aggs"]["per_month"]["date_histogram"].get("time_zone").is_none());
    }
}

//! Result shaper
//!
//! Turns raw backend output - already-shaped documents from the store,
//! nested bucket trees from the search index - into the two canonical row
//! shapes, independent of which backend produced it. Any malformed node
//! fails the whole call: partial or inconsistent result sets are never
//! returned.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use edumetrics_domain::constants::{
    FIELD_ACCOUNTS, FIELD_DATE, FIELD_INDICATOR_VALUE, FIELD_MODULE_ID, FIELD_PROFILE_ID,
    FIELD_STRUCTURES_ID,
};
use edumetrics_domain::{DisplayKey, DisplayRow, ExportRow, Indicator, Result, StatsError};
use serde_json::Value;

/// Display label of a month bucket, day-truncated store format.
const DISPLAY_MONTH_FORMAT: &str = "%Y-%m-%d 00:00.00.000";
/// Export label of a month bucket, year-month only.
const EXPORT_MONTH_FORMAT: &str = "%Y-%m";

/* -------------------------------------------------------------------------- */
/* Document rows */
/* -------------------------------------------------------------------------- */

/// Decode display rows from store documents (direct lookups and display
/// pipelines produce the same shape: profile, date-or-module key, the
/// indicator-named value, optionally `accounts`).
pub fn display_rows_from_documents(
    docs: Vec<Value>,
    indicator: Indicator,
) -> Result<Vec<DisplayRow>> {
    docs.iter()
        .map(|doc| {
            let key = if doc.get(FIELD_DATE).is_some() {
                DisplayKey::Date(field_str(doc, FIELD_DATE)?)
            } else {
                DisplayKey::Module(field_str(doc, FIELD_MODULE_ID)?)
            };
            Ok(DisplayRow {
                key,
                profile_id: field_str(doc, FIELD_PROFILE_ID)?,
                value: field_count(doc, indicator.field())?,
                accounts: optional_count(doc, FIELD_ACCOUNTS, indicator.tracks_accounts())?,
            })
        })
        .collect()
}

/// Decode export rows from the export pipeline's output (already flattened
/// and renamed to the indicator-agnostic shape).
pub fn export_rows_from_documents(docs: Vec<Value>) -> Result<Vec<ExportRow>> {
    docs.iter()
        .map(|doc| {
            Ok(ExportRow {
                structure_id: field_str(doc, FIELD_STRUCTURES_ID)?,
                date: field_str(doc, FIELD_DATE)?,
                profile_id: field_str(doc, FIELD_PROFILE_ID)?,
                module_id: match doc.get(FIELD_MODULE_ID) {
                    Some(_) => Some(field_str(doc, FIELD_MODULE_ID)?),
                    None => None,
                },
                value: field_count(doc, FIELD_INDICATOR_VALUE)?,
                accounts: optional_count(doc, FIELD_ACCOUNTS, doc.get(FIELD_ACCOUNTS).is_some())?,
            })
        })
        .collect()
}

/* -------------------------------------------------------------------------- */
/* Search-index bucket trees */
/* -------------------------------------------------------------------------- */

/// Walk a display response: month (or module) buckets -> profile buckets.
pub fn display_rows_from_search(
    response: &Value,
    indicator: Indicator,
    by_module: bool,
    tz: Tz,
) -> Result<Vec<DisplayRow>> {
    let aggregations = node(response, "aggregations")?;
    let mut rows = Vec::new();
    for bucket in buckets(node(aggregations, "per_month")?)? {
        let key = if by_module {
            DisplayKey::Module(key_str(bucket)?)
        } else {
            DisplayKey::Date(month_label(key_millis(bucket)?, tz, DISPLAY_MONTH_FORMAT)?)
        };
        for profile in buckets(node(bucket, "group_by")?)? {
            let (value, accounts) = profile_value(profile, indicator)?;
            rows.push(DisplayRow {
                key: key.clone(),
                profile_id: key_str(profile)?,
                value,
                accounts,
            });
        }
    }
    Ok(rows)
}

/// Walk an export response: structure buckets (keys outside the requested
/// scope are discarded) -> month buckets -> profile buckets -> module buckets
/// when the breakdown applies. A module filter value, when present, is
/// echoed into every row.
pub fn export_rows_from_search(
    response: &Value,
    indicator: Indicator,
    by_module: bool,
    structures: &[String],
    module: Option<&str>,
    tz: Tz,
) -> Result<Vec<ExportRow>> {
    let aggregations = node(response, "aggregations")?;
    let mut rows = Vec::new();
    for structure_bucket in buckets(node(aggregations, "per_structure")?)? {
        let structure = key_str(structure_bucket)?;
        if !structures.contains(&structure) {
            continue;
        }
        for month_bucket in buckets(node(structure_bucket, "per_month")?)? {
            let date = month_label(key_millis(month_bucket)?, tz, EXPORT_MONTH_FORMAT)?;
            for profile_bucket in buckets(node(month_bucket, "group_by")?)? {
                let profile = key_str(profile_bucket)?;
                if by_module {
                    for module_bucket in buckets(node(profile_bucket, "per_module")?)? {
                        rows.push(ExportRow {
                            structure_id: structure.clone(),
                            date: date.clone(),
                            profile_id: profile.clone(),
                            module_id: Some(key_str(module_bucket)?),
                            value: field_count(module_bucket, "doc_count")?,
                            accounts: None,
                        });
                    }
                } else {
                    let (value, accounts) = profile_value(profile_bucket, indicator)?;
                    rows.push(ExportRow {
                        structure_id: structure.clone(),
                        date: date.clone(),
                        profile_id: profile.clone(),
                        module_id: module.map(str::to_string),
                        value,
                        accounts,
                    });
                }
            }
        }
    }
    Ok(rows)
}

/* -------------------------------------------------------------------------- */
/* Canonical ordering */
/* -------------------------------------------------------------------------- */

/// Canonical display order: (date-or-module key, profile). Applied by both
/// adapters so the equivalence contract covers ordering.
pub fn sort_display_rows(rows: &mut [DisplayRow]) {
    rows.sort_by(|a, b| (&a.key, &a.profile_id).cmp(&(&b.key, &b.profile_id)));
}

/// Canonical export order: (structure, date, profile, module).
pub fn sort_export_rows(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| {
        (&a.structure_id, &a.date, &a.profile_id, &a.module_id)
            .cmp(&(&b.structure_id, &b.date, &b.profile_id, &b.module_id))
    });
}

/* -------------------------------------------------------------------------- */
/* Node access */
/* -------------------------------------------------------------------------- */

fn node<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| StatsError::Formatting(format!("missing node `{key}`")))
}

fn buckets(aggregation: &Value) -> Result<&Vec<Value>> {
    node(aggregation, "buckets")?
        .as_array()
        .ok_or_else(|| StatsError::Formatting("`buckets` is not an array".to_string()))
}

fn key_str(bucket: &Value) -> Result<String> {
    node(bucket, "key")?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StatsError::Formatting("bucket key is not a string".to_string()))
}

fn key_millis(bucket: &Value) -> Result<i64> {
    node(bucket, "key")?
        .as_i64()
        .ok_or_else(|| StatsError::Formatting("bucket key is not a timestamp".to_string()))
}

fn month_label(millis: i64, tz: Tz, format: &str) -> Result<String> {
    let at = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| StatsError::Formatting(format!("bucket timestamp {millis} out of range")))?;
    Ok(at.with_timezone(&tz).format(format).to_string())
}

/// Per-profile value extraction: approximate distinct count for unique
/// visitors, the two sums for activated accounts, the raw document count
/// otherwise.
fn profile_value(bucket: &Value, indicator: Indicator) -> Result<(i64, Option<i64>)> {
    match indicator {
        Indicator::UniqueVisitors => {
            Ok((field_count(node(bucket, "unique_count")?, "value")?, None))
        }
        Indicator::ActivatedAccounts => Ok((
            field_count(node(bucket, "activated_accounts")?, "value")?,
            Some(field_count(node(bucket, "accounts")?, "value")?),
        )),
        _ => Ok((field_count(bucket, "doc_count")?, None)),
    }
}

fn field_str(doc: &Value, field: &str) -> Result<String> {
    node(doc, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StatsError::Formatting(format!("field `{field}` is not a string")))
}

fn field_count(doc: &Value, field: &str) -> Result<i64> {
    let value = node(doc, field)?;
    as_count(value).ok_or_else(|| StatsError::Formatting(format!("field `{field}` is not a number")))
}

fn optional_count(doc: &Value, field: &str, wanted: bool) -> Result<Option<i64>> {
    if !wanted {
        return Ok(None);
    }
    field_count(doc, field).map(Some)
}

fn as_count(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|float| float as i64))
}

//! In-memory document store
//!
//! Evaluates the filter, sort, projection and pipeline descriptors the
//! document planner emits, over plain JSON documents. Only the operator
//! subset the planner produces is supported; anything else is an error so
//! planner drift shows up in tests immediately.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use edumetrics_core::DocumentStore;
use edumetrics_domain::{Result, StatRecord, StatsError};
use serde_json::{Map, Value};

/// In-memory stand-in for the document store.
#[derive(Default)]
pub struct InMemoryStatsStore {
    docs: Mutex<Vec<Value>>,
}

impl InMemoryStatsStore {
    /// Seed the store with stat records.
    pub fn with_records(records: Vec<StatRecord>) -> Self {
        let docs = records
            .into_iter()
            .map(|record| serde_json::to_value(record).expect("record serializes"))
            .collect();
        Self { docs: Mutex::new(docs) }
    }

    pub fn documents(&self) -> Vec<Value> {
        self.docs.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStatsStore {
    async fn find(
        &self,
        _collection: &str,
        filter: Value,
        sort: Value,
        projection: Value,
    ) -> Result<Vec<Value>> {
        let mut matched: Vec<Value> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|doc| matches_filter(doc, &filter))
            .cloned()
            .collect();
        sort_docs(&mut matched, &sort);
        matched.iter().map(|doc| project_doc(doc, &projection)).collect()
    }

    async fn aggregate(&self, _collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>> {
        let mut current = self.documents();
        for stage in &pipeline {
            let stage = stage
                .as_object()
                .filter(|obj| obj.len() == 1)
                .ok_or_else(|| StatsError::Backend("malformed pipeline stage".to_string()))?;
            let (operator, spec) = stage.iter().next().expect("single-entry stage");
            match operator.as_str() {
                "$match" => current.retain(|doc| matches_filter(doc, spec)),
                "$group" => current = group_stage(&current, spec)?,
                "$project" => {
                    current =
                        current.iter().map(|doc| project_doc(doc, spec)).collect::<Result<_>>()?
                }
                "$sort" => sort_docs(&mut current, spec),
                other => {
                    return Err(StatsError::Backend(format!("unsupported stage {other}")));
                }
            }
        }
        Ok(current)
    }

    async fn upsert(&self, _collection: &str, filter: Value, update: Value) -> Result<()> {
        let fields = filter
            .as_object()
            .ok_or_else(|| StatsError::Backend("upsert filter must be an object".to_string()))?;
        let mut docs = self.docs.lock().unwrap();
        let position = docs
            .iter()
            .position(|doc| fields.iter().all(|(key, value)| doc.get(key) == Some(value)));
        let doc = match position {
            Some(index) => &mut docs[index],
            None => {
                docs.push(filter.clone());
                docs.last_mut().expect("just pushed")
            }
        };
        if let Some(set) = update.get("$set").and_then(Value::as_object) {
            for (field, value) in set {
                doc[field] = value.clone();
            }
        }
        Ok(())
    }

    async fn delete(&self, _collection: &str, filter: Value) -> Result<u64> {
        let mut docs = self.docs.lock().unwrap();
        let before = docs.len();
        docs.retain(|doc| !matches_filter(doc, &filter));
        Ok((before - docs.len()) as u64)
    }
}

/* -------------------------------------------------------------------------- */
/* Filter evaluation */
/* -------------------------------------------------------------------------- */

fn matches_filter(doc: &Value, filter: &Value) -> bool {
    let Some(clauses) = filter.as_object() else {
        return false;
    };
    clauses.iter().all(|(key, condition)| {
        if key == "$and" {
            condition
                .as_array()
                .is_some_and(|subs| subs.iter().all(|sub| matches_filter(doc, sub)))
        } else {
            field_matches(doc.get(key), condition)
        }
    })
}

fn field_matches(actual: Option<&Value>, condition: &Value) -> bool {
    match condition.as_object() {
        Some(ops) if ops.keys().any(|key| key.starts_with('$')) => {
            ops.iter().all(|(op, operand)| match op.as_str() {
                "$gte" => actual.is_some_and(|value| compare(value, operand) != Ordering::Less),
                "$lt" => actual.is_some_and(|value| compare(value, operand) == Ordering::Less),
                "$in" => operand
                    .as_array()
                    .is_some_and(|set| actual.is_some_and(|value| set.contains(value))),
                "$exists" => actual.is_some() == operand.as_bool().unwrap_or(true),
                other => panic!("unsupported filter operator {other}"),
            })
        }
        _ => actual == Some(condition),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => {
            let x = a.as_f64().unwrap_or(f64::MIN);
            let y = b.as_f64().unwrap_or(f64::MIN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Pipeline stages */
/* -------------------------------------------------------------------------- */

/// Resolve `"$field"` / `"$_id.field"` references; anything else is a
/// literal.
fn resolve(doc: &Value, expr: &Value) -> Value {
    if let Some(path) = expr.as_str() {
        if let Some(stripped) = path.strip_prefix('$') {
            return stripped
                .split('.')
                .try_fold(doc, |node, segment| node.get(segment))
                .cloned()
                .unwrap_or(Value::Null);
        }
    }
    expr.clone()
}

fn group_stage(docs: &[Value], spec: &Value) -> Result<Vec<Value>> {
    let spec = spec
        .as_object()
        .ok_or_else(|| StatsError::Backend("$group spec must be an object".to_string()))?;
    let id_spec = spec
        .get("_id")
        .and_then(Value::as_object)
        .ok_or_else(|| StatsError::Backend("$group requires a composite _id".to_string()))?;

    let mut groups: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for doc in docs {
        let mut id = Map::new();
        for (out, expr) in id_spec {
            id.insert(out.clone(), resolve(doc, expr));
        }
        let key = Value::Object(id.clone()).to_string();
        let entry = groups.entry(key).or_insert_with(move || {
            let mut base = Map::new();
            base.insert("_id".to_string(), Value::Object(id));
            base
        });
        for (field, accumulator) in spec.iter().filter(|(field, _)| field.as_str() != "_id") {
            let operand = accumulator.get("$sum").ok_or_else(|| {
                StatsError::Backend(format!("unsupported accumulator for {field}"))
            })?;
            let add = resolve(doc, operand).as_i64().unwrap_or(0);
            let sum = entry.get(field).and_then(Value::as_i64).unwrap_or(0) + add;
            entry.insert(field.clone(), Value::from(sum));
        }
    }
    Ok(groups.into_values().map(Value::Object).collect())
}

fn project_doc(doc: &Value, spec: &Value) -> Result<Value> {
    let spec = spec
        .as_object()
        .ok_or_else(|| StatsError::Backend("$project spec must be an object".to_string()))?;
    let mut out = Map::new();
    for (key, expr) in spec {
        match expr {
            // Exclusion; the planners only ever exclude `_id`.
            Value::Number(n) if n.as_i64() == Some(0) => {}
            Value::Number(n) if n.as_i64() == Some(1) => {
                if let Some(value) = doc.get(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
            Value::String(_) => {
                let value = resolve(doc, expr);
                if !value.is_null() {
                    out.insert(key.clone(), value);
                }
            }
            Value::Object(op) if op.contains_key("$substr") => {
                let args = op["$substr"].as_array().ok_or_else(|| {
                    StatsError::Backend("$substr requires an argument array".to_string())
                })?;
                let source = resolve(doc, &args[0]);
                let text = source.as_str().unwrap_or_default();
                let start = args[1].as_u64().unwrap_or(0) as usize;
                let len = args[2].as_u64().unwrap_or(0) as usize;
                let piece = text.get(start..start + len).unwrap_or(text);
                out.insert(key.clone(), Value::from(piece));
            }
            _ => {
                return Err(StatsError::Backend(format!("unsupported projection for {key}")));
            }
        }
    }
    Ok(Value::Object(out))
}

fn sort_docs(docs: &mut [Value], spec: &Value) {
    let Some(fields) = spec.as_object() else {
        return;
    };
    let fields: Vec<(&String, i64)> =
        fields.iter().map(|(field, dir)| (field, dir.as_i64().unwrap_or(1))).collect();
    docs.sort_by(|a, b| {
        for (field, direction) in &fields {
            let ord = compare(
                a.get(field.as_str()).unwrap_or(&Value::Null),
                b.get(field.as_str()).unwrap_or(&Value::Null),
            );
            let ord = if *direction < 0 { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

//! Activated-accounts indicator
//!
//! Reads per (structure, profile) account totals from the graph source and
//! upserts them into the stats collection. This is the one indicator whose
//! data does not come from behavioral events: activation state lives on the
//! accounts themselves.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edumetrics_domain::constants::{
    FIELD_ACCOUNTS, FIELD_ACTIVATED_ACCOUNTS, FIELD_DATE, FIELD_GROUPED_BY, FIELD_PROFILE_ID,
    FIELD_STRUCTURES_ID,
};
use edumetrics_domain::utils::dates::format_store_date;
use edumetrics_domain::{DayOutcome, DayWindow, GroupBy, Indicator, Result};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::indicators::ports::DayIndicator;
use crate::stats::obj;
use crate::stats::ports::{DocumentStore, GraphSource};

/// Account and activated-account counts per profile and structure. An
/// account counts as activated once it carries a credential.
const ACCOUNTS_QUERY: &str = "MATCH (u:User)-[:IN]->(:ProfileGroup)-[:DEPENDS]->(s:Structure) \
     RETURN s.id AS structure, HEAD(u.profiles) AS profile, \
     count(distinct u) AS accounts, count(distinct u.password) AS activatedAccounts \
     ORDER BY structure, profile";

/// Nightly indicator deriving activated-account totals from the graph.
pub struct ActivatedAccountsIndicator {
    graph: Arc<dyn GraphSource>,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

#[derive(Debug, Deserialize)]
struct AccountsRow {
    structure: String,
    profile: String,
    accounts: i64,
    #[serde(rename = "activatedAccounts")]
    activated_accounts: i64,
}

impl ActivatedAccountsIndicator {
    pub fn new(
        graph: Arc<dyn GraphSource>,
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self { graph, store, collection: collection.into() }
    }
}

#[async_trait]
impl DayIndicator for ActivatedAccountsIndicator {
    fn key(&self) -> &'static str {
        Indicator::ActivatedAccounts.field()
    }

    async fn compute_day(
        &self,
        _window: DayWindow,
        write_date: DateTime<Utc>,
    ) -> Result<DayOutcome> {
        let started = Instant::now();

        let raw = match self.graph.execute(ACCOUNTS_QUERY, json!({})).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(indicator = self.key(), error = %err, "source query failed, skipping day");
                return Ok(DayOutcome::Skipped);
            }
        };
        if raw.is_empty() {
            return Ok(DayOutcome::Skipped);
        }

        // A malformed row skips the whole day rather than writing a partial
        // batch.
        let rows: Vec<AccountsRow> = match raw
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()
        {
            Ok(rows) => rows,
            Err(err) => {
                error!(indicator = self.key(), error = %err, "malformed source row, skipping day");
                return Ok(DayOutcome::Skipped);
            }
        };

        let date = format_store_date(write_date);
        let upserts = rows.iter().map(|row| {
            let filter = obj([
                (FIELD_DATE, Value::from(date.as_str())),
                (FIELD_GROUPED_BY, Value::from(GroupBy::StructuresProfile.as_str())),
                (FIELD_PROFILE_ID, Value::from(row.profile.as_str())),
                (FIELD_STRUCTURES_ID, Value::from(row.structure.as_str())),
            ]);
            let update = json!({ "$set": obj([
                (FIELD_ACCOUNTS, Value::from(row.accounts)),
                (FIELD_ACTIVATED_ACCOUNTS, Value::from(row.activated_accounts)),
            ]) });
            self.store.upsert(&self.collection, filter, update)
        });

        // Join all upserts, counting completions regardless of outcome; a
        // failed row never aborts its siblings.
        let mut failures = 0;
        for (row, result) in rows.iter().zip(join_all(upserts).await) {
            if let Err(err) = result {
                failures += 1;
                warn!(
                    indicator = self.key(),
                    structure = %row.structure,
                    profile = %row.profile,
                    error = %err,
                    "stat record upsert failed"
                );
            }
        }

        info!(
            indicator = self.key(),
            rows = rows.len(),
            failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation finished"
        );
        Ok(DayOutcome::Written { rows: rows.len(), failures })
    }
}

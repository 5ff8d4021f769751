//! Canonical result rows
//!
//! Both backend adapters reshape their raw output into these two row shapes;
//! the serving and export layers are written against them and never branch
//! on which backend produced a row.

use serde_json::{Map, Value};

use crate::constants::{
    FIELD_ACCOUNTS, FIELD_DATE, FIELD_INDICATOR_VALUE, FIELD_MODULE_ID, FIELD_PROFILE_ID,
    FIELD_STRUCTURES_ID,
};
use crate::types::Indicator;

/// Leading dimension of a display row: a month anchor date for time trends,
/// or a module id for the "access, all modules" breakdown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DisplayKey {
    /// Store-formatted month anchor, "yyyy-MM-dd 00:00.00.000"
    Date(String),
    /// Module id
    Module(String),
}

impl DisplayKey {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayKey::Date(s) | DisplayKey::Module(s) => s,
        }
    }
}

/// Row shape for interactive display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub key: DisplayKey,
    pub profile_id: String,
    pub value: i64,
    /// Total account count, present for the activated-accounts indicator
    pub accounts: Option<i64>,
}

impl DisplayRow {
    /// Wire rendering: the value field is named after the indicator, the key
    /// field after its dimension.
    pub fn to_document(&self, indicator: Indicator) -> Value {
        let mut doc = Map::new();
        let key_field = match &self.key {
            DisplayKey::Date(_) => FIELD_DATE,
            DisplayKey::Module(_) => FIELD_MODULE_ID,
        };
        doc.insert(key_field.to_string(), Value::from(self.key.as_str()));
        doc.insert(FIELD_PROFILE_ID.to_string(), Value::from(self.profile_id.clone()));
        doc.insert(indicator.field().to_string(), Value::from(self.value));
        if let Some(accounts) = self.accounts {
            doc.insert(FIELD_ACCOUNTS.to_string(), Value::from(accounts));
        }
        Value::Object(doc)
    }
}

/// Flattened row shape for bulk export, indicator-agnostic field naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub structure_id: String,
    /// Year-month, "yyyy-MM"
    pub date: String,
    pub profile_id: String,
    pub module_id: Option<String>,
    pub value: i64,
    pub accounts: Option<i64>,
}

impl ExportRow {
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(FIELD_STRUCTURES_ID.to_string(), Value::from(self.structure_id.clone()));
        doc.insert(FIELD_DATE.to_string(), Value::from(self.date.clone()));
        doc.insert(FIELD_PROFILE_ID.to_string(), Value::from(self.profile_id.clone()));
        doc.insert(FIELD_INDICATOR_VALUE.to_string(), Value::from(self.value));
        if let Some(module_id) = &self.module_id {
            doc.insert(FIELD_MODULE_ID.to_string(), Value::from(module_id.clone()));
        }
        if let Some(accounts) = self.accounts {
            doc.insert(FIELD_ACCOUNTS.to_string(), Value::from(accounts));
        }
        Value::Object(doc)
    }
}

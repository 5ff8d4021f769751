//! Indicator registry
//!
//! Maps indicator keys to their daily computation strategies. Built once at
//! startup; registering a new indicator requires no scheduler change.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::indicators::ports::DayIndicator;

/// Registry of daily indicator computations, dispatched in key order.
#[derive(Default, Clone)]
pub struct IndicatorRegistry {
    indicators: BTreeMap<&'static str, Arc<dyn DayIndicator>>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an indicator under its key. A later registration for the
    /// same key replaces the earlier one.
    pub fn register(&mut self, indicator: Arc<dyn DayIndicator>) {
        self.indicators.insert(indicator.key(), indicator);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn DayIndicator>> {
        self.indicators.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DayIndicator>> {
        self.indicators.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.indicators.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

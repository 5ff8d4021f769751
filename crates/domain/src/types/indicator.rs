//! Indicator and group-by signatures
//!
//! An indicator is a named metric with its own grouping rule and query
//! strategy. The wire names below are the stored field names and the values
//! accepted from callers; both backends key their queries off the same enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::StatsError;

/// Named usage metric served by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    /// Login count
    #[serde(rename = "CONNEXION")]
    Connexion,
    /// Distinct users having logged in
    #[serde(rename = "uniqueVisitors")]
    UniqueVisitors,
    /// Account activations
    #[serde(rename = "ACTIVATION")]
    Activation,
    /// Service/module access count
    #[serde(rename = "ACCESS")]
    Access,
    /// External connector usage count
    #[serde(rename = "CONNECTOR")]
    Connector,
    /// Activated-account totals, derived nightly from the graph source
    #[serde(rename = "activatedAccounts")]
    ActivatedAccounts,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Connexion,
        Indicator::UniqueVisitors,
        Indicator::Activation,
        Indicator::Access,
        Indicator::Connector,
        Indicator::ActivatedAccounts,
    ];

    /// Field name carrying this indicator's value on stored rows.
    pub fn field(&self) -> &'static str {
        match self {
            Indicator::Connexion => "CONNEXION",
            Indicator::UniqueVisitors => "uniqueVisitors",
            Indicator::Activation => "ACTIVATION",
            Indicator::Access => "ACCESS",
            Indicator::Connector => "CONNECTOR",
            Indicator::ActivatedAccounts => "activatedAccounts",
        }
    }

    /// Event type filtered on the search-index path.
    ///
    /// Unique visitors count distinct users over login events; activated
    /// accounts aggregate the nightly "accounts" documents.
    pub fn event_type(&self) -> &'static str {
        match self {
            Indicator::Connexion | Indicator::UniqueVisitors => "CONNEXION",
            Indicator::Activation => "ACTIVATION",
            Indicator::Access => "ACCESS",
            Indicator::Connector => "CONNECTOR",
            Indicator::ActivatedAccounts => "accounts",
        }
    }

    /// Group-by signature stamped on stored rows for this indicator family.
    pub fn group_by(&self) -> GroupBy {
        if self.is_module_scoped() {
            GroupBy::ModuleStructuresProfile
        } else {
            GroupBy::StructuresProfile
        }
    }

    /// Access and connector indicators may be narrowed to a single module.
    pub fn is_module_scoped(&self) -> bool {
        matches!(self, Indicator::Access | Indicator::Connector)
    }

    /// Activated accounts carry the total `accounts` companion field.
    pub fn tracks_accounts(&self) -> bool {
        matches!(self, Indicator::ActivatedAccounts)
    }
}

impl FromStr for Indicator {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Indicator::ALL
            .iter()
            .copied()
            .find(|i| i.field() == s)
            .ok_or_else(|| StatsError::UnknownIndicator(s.to_string()))
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Dimension-set identifier recorded on stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupBy {
    /// Aggregated per structure and profile
    #[serde(rename = "structures/profil")]
    StructuresProfile,
    /// Aggregated per module, structure and profile
    #[serde(rename = "module/structures/profil")]
    ModuleStructuresProfile,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::StructuresProfile => "structures/profil",
            GroupBy::ModuleStructuresProfile => "module/structures/profil",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

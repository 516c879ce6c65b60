//! The verbose in-memory artifact record (schema version 1.0).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Schema version stamped on every normalized record.
pub const MODEL_VERSION: &str = "1.0";

/// A single logical finding: canonical value plus provenance, typing, and
/// timing metadata.
///
/// `types` never contains the primary `type`; together they form the full
/// category set. `tools` contains `tool` whenever `tool` is non-empty.
/// `metadata` is an open map; the `raw` key may hold a scalar or a list of
/// raw input lines, and that heterogeneity is part of the contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub types: BTreeSet<String>,
    pub value: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tools: BTreeSet<String>,
    #[serde(default)]
    pub occurrences: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_seen: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_seen: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Artifact {
    /// A fresh finding, observed reachable, not yet recorded.
    #[must_use]
    pub fn new(artifact_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            value: value.into(),
            up: true,
            ..Self::default()
        }
    }

    /// Add a secondary type.
    #[must_use]
    pub fn with_secondary(mut self, artifact_type: impl Into<String>) -> Self {
        self.types.insert(artifact_type.into());
        self
    }

    /// Mark the discovery as coming from an active probe.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Record whether the target was observed reachable.
    #[must_use]
    pub fn with_up(mut self, up: bool) -> Self {
        self.up = up;
        self
    }

    /// Set the producing tool.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Attach one metadata entry. Null and empty-string values are dropped
    /// by store normalization, so callers can attach unconditionally.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

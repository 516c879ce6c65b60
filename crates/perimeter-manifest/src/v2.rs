//! Compact record shapes, exactly as they appear on disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "2.0";

/// The first line of every manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderV2 {
    /// Schema version, always `"2.0"`.
    #[serde(rename = "$")]
    pub schema: String,
    /// Base time as epoch seconds; record timestamps are offsets from it.
    #[serde(rename = "@")]
    pub base: i64,
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Issuer aliases used by records in this file, compact → full.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

/// Reachability and probe mode folded into one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateV2 {
    Up,
    Down,
    ActiveUp,
    ActiveDown,
}

impl StateV2 {
    #[must_use]
    pub fn from_flags(active: bool, up: bool) -> Self {
        match (active, up) {
            (true, true) => Self::ActiveUp,
            (true, false) => Self::ActiveDown,
            (false, true) => Self::Up,
            (false, false) => Self::Down,
        }
    }

    #[must_use]
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::ActiveUp => (true, true),
            Self::ActiveDown => (true, false),
            Self::Up => (false, true),
            Self::Down => (false, false),
        }
    }
}

/// One record line. `v` is a plain string for most types and a compact
/// sub-object for certificates and gf findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactV2 {
    #[serde(rename = "t")]
    pub artifact_type: String,
    #[serde(rename = "v")]
    pub value: Value,
    #[serde(rename = "st")]
    pub state: StateV2,
    #[serde(rename = "tl", default, skip_serializing_if = "String::is_empty")]
    pub tool: String,
    #[serde(rename = "tls", default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(rename = "n", default, skip_serializing_if = "is_zero")]
    pub occurrences: u64,
    /// Offsets from the header base in milliseconds; one element when
    /// first == last, two otherwise.
    #[serde(rename = "ts", default, skip_serializing_if = "Vec::is_empty")]
    pub timestamps: Vec<i64>,
    #[serde(rename = "ty", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(rename = "m", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Compact certificate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateV2 {
    pub cn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    pub iss: String,
    pub nb: String,
    pub na: String,
    pub sn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Compact gf-finding value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GfFindingV2 {
    pub res: String,
    pub ev: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub r: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_flags() {
        for state in [StateV2::Up, StateV2::Down, StateV2::ActiveUp, StateV2::ActiveDown] {
            let (active, up) = state.flags();
            assert_eq!(StateV2::from_flags(active, up), state);
        }
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&StateV2::ActiveUp).unwrap(), "\"active_up\"");
        assert_eq!(serde_json::to_string(&StateV2::Down).unwrap(), "\"down\"");
    }

    #[test]
    fn header_field_names_are_compact() {
        let header = HeaderV2 {
            schema: SCHEMA_VERSION.into(),
            base: 1_728_848_984,
            target: "example.com".into(),
            tools: vec!["subfinder".into()],
            aliases: BTreeMap::new(),
        };
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["$"], "2.0");
        assert_eq!(json["@"], 1_728_848_984);
        assert!(json.get("aliases").is_none());
    }

    #[test]
    fn record_omits_empty_fields() {
        let record = ArtifactV2 {
            artifact_type: "domain".into(),
            value: Value::String("example.com".into()),
            state: StateV2::Up,
            tool: String::new(),
            tools: Vec::new(),
            occurrences: 1,
            timestamps: vec![0],
            types: Vec::new(),
            metadata: BTreeMap::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("tl"));
        assert!(!obj.contains_key("tls"));
        assert!(!obj.contains_key("ty"));
        assert!(!obj.contains_key("m"));
        assert_eq!(obj["n"], 1);
        assert_eq!(obj["ts"], serde_json::json!([0]));
    }
}

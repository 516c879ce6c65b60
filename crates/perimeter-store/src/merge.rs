//! Normalization on record and merge-on-collision semantics.
//!
//! These are pure functions so the locking story stays in the shard layer.
//! Handlers are free to emit sloppy artifacts; everything that reaches a
//! shard index has passed through [`normalize`] first.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use perimeter_model::{Artifact, MODEL_VERSION};

/// Normalize an incoming artifact, stamping provenance and timestamps.
///
/// Returns `None` when the artifact is empty after trimming; such records
/// are dropped silently.
#[must_use]
pub fn normalize(tool: &str, mut artifact: Artifact, now: DateTime<Utc>) -> Option<Artifact> {
    artifact.artifact_type = artifact.artifact_type.trim().to_string();
    artifact.value = artifact.value.trim().to_string();
    if artifact.value.is_empty() {
        return None;
    }

    // Consolidate primary + secondary types into one sorted set, then pick
    // the primary back out: the original if still present, else the
    // smallest.
    let mut all_types: std::collections::BTreeSet<String> = artifact
        .types
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if !artifact.artifact_type.is_empty() {
        all_types.insert(artifact.artifact_type.clone());
    }
    let primary = if !artifact.artifact_type.is_empty()
        && all_types.contains(&artifact.artifact_type)
    {
        artifact.artifact_type.clone()
    } else {
        all_types.iter().next().cloned().unwrap_or_default()
    };
    all_types.remove(&primary);
    artifact.artifact_type = primary;
    artifact.types = all_types;

    artifact
        .metadata
        .retain(|_, v| !matches!(v, Value::Null) && !matches!(v, Value::String(s) if s.is_empty()));

    if artifact.tool.is_empty() {
        artifact.tool = tool.trim().to_string();
    }
    if !artifact.tool.is_empty() {
        artifact.tools.insert(artifact.tool.clone());
    }

    artifact.version = MODEL_VERSION.to_string();
    let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    if artifact.first_seen.is_empty() {
        artifact.first_seen = stamp.clone();
    }
    artifact.last_seen = stamp;
    artifact.occurrences = artifact.occurrences.max(1);

    Some(artifact)
}

/// Merge a normalized incoming artifact into the stored record for the
/// same key.
pub fn merge_into(existing: &mut Artifact, incoming: Artifact) {
    merge_metadata(&mut existing.metadata, incoming.metadata);

    existing.types.extend(incoming.types);
    if !incoming.artifact_type.is_empty() && incoming.artifact_type != existing.artifact_type {
        existing.types.insert(incoming.artifact_type);
    }
    existing.types.remove(&existing.artifact_type);

    existing.up = existing.up && incoming.up;
    existing.occurrences += incoming.occurrences;

    if ts_lt(&incoming.first_seen, &existing.first_seen) {
        existing.first_seen = incoming.first_seen;
    }
    if ts_lt(&existing.last_seen, &incoming.last_seen) {
        existing.last_seen = incoming.last_seen;
    }

    if incoming.version > existing.version {
        existing.version = incoming.version;
    }

    existing.tools.extend(incoming.tools);
    if existing.tool.is_empty() {
        existing.tool = incoming.tool;
        if !existing.tool.is_empty() {
            existing.tools.insert(existing.tool.clone());
        }
    }
}

/// Per-key first-writer-wins, except `raw`, which accumulates every
/// distinct raw line across scalar, list, and mixed inputs.
fn merge_metadata(existing: &mut BTreeMap<String, Value>, incoming: BTreeMap<String, Value>) {
    for (key, value) in incoming {
        if key == "raw" {
            let merged = merge_raw(existing.remove("raw"), value);
            existing.insert(key, merged);
        } else {
            existing.entry(key).or_insert(value);
        }
    }
}

fn merge_raw(existing: Option<Value>, incoming: Value) -> Value {
    let mut lines: Vec<String> = Vec::new();
    for value in existing.into_iter().chain(std::iter::once(incoming)) {
        for line in raw_lines(value) {
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
    }
    match lines.len() {
        1 => Value::String(lines.remove(0)),
        _ => Value::Array(lines.into_iter().map(Value::String).collect()),
    }
}

fn raw_lines(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Chronological less-than over RFC 3339 strings, falling back to lexical
/// order when either side does not parse. Empty strings never win.
fn ts_lt(a: &str, b: &str) -> bool {
    if a.is_empty() {
        return false;
    }
    if b.is_empty() {
        return true;
    }
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a < b,
        _ => a < b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_728_848_984, 0).unwrap()
    }

    #[test]
    fn empty_value_is_dropped() {
        assert!(normalize("t", Artifact::new("domain", "   "), now()).is_none());
        assert!(normalize("t", Artifact::new("domain", ""), now()).is_none());
    }

    #[test]
    fn normalization_stamps_version_and_timestamps() {
        let artifact = normalize("subfinder", Artifact::new("domain", " example.com "), now()).unwrap();
        assert_eq!(artifact.value, "example.com");
        assert_eq!(artifact.version, "1.0");
        assert_eq!(artifact.first_seen, "2024-10-13T19:29:44Z");
        assert_eq!(artifact.first_seen, artifact.last_seen);
        assert_eq!(artifact.occurrences, 1);
    }

    #[test]
    fn tool_falls_back_to_record_argument() {
        let artifact = normalize("subfinder", Artifact::new("domain", "example.com"), now()).unwrap();
        assert_eq!(artifact.tool, "subfinder");
        assert!(artifact.tools.contains("subfinder"));

        let artifact = normalize(
            "subfinder",
            Artifact::new("domain", "example.com").with_tool("amass"),
            now(),
        )
        .unwrap();
        assert_eq!(artifact.tool, "amass");
    }

    #[test]
    fn primary_type_survives_consolidation() {
        let artifact = normalize(
            "t",
            Artifact::new("js", "https://a.example.com/x").with_secondary("route"),
            now(),
        )
        .unwrap();
        assert_eq!(artifact.artifact_type, "js");
        assert_eq!(
            artifact.types.iter().collect::<Vec<_>>(),
            vec!["route"]
        );
    }

    #[test]
    fn missing_primary_takes_smallest_type() {
        let mut incoming = Artifact::new("", "x");
        incoming.types.insert("route".to_string());
        incoming.types.insert("js".to_string());
        let artifact = normalize("t", incoming, now()).unwrap();
        assert_eq!(artifact.artifact_type, "js");
        assert!(artifact.types.contains("route"));
        assert!(!artifact.types.contains("js"));
    }

    #[test]
    fn empty_metadata_entries_are_dropped() {
        let artifact = normalize(
            "t",
            Artifact::new("domain", "example.com")
                .with_meta("keep", "yes")
                .with_meta("empty", "")
                .with_meta("null", Value::Null),
            now(),
        )
        .unwrap();
        assert_eq!(artifact.metadata.len(), 1);
        assert!(artifact.metadata.contains_key("keep"));
    }

    fn normalized(artifact: Artifact) -> Artifact {
        normalize("tool", artifact, now()).unwrap()
    }

    #[test]
    fn merge_unions_types_and_tools() {
        let mut stored = normalized(Artifact::new("js", "https://x.example.com/a").with_tool("gau"));
        let incoming = normalized(
            Artifact::new("html", "https://x.example.com/a")
                .with_secondary("route")
                .with_tool("httpx"),
        );
        merge_into(&mut stored, incoming);

        assert_eq!(stored.artifact_type, "js");
        assert!(stored.types.contains("html"));
        assert!(stored.types.contains("route"));
        assert!(!stored.types.contains("js"));
        assert!(stored.tools.contains("gau"));
        assert!(stored.tools.contains("httpx"));
        assert_eq!(stored.occurrences, 2);
    }

    #[test]
    fn merge_up_is_conjunctive() {
        let mut stored = normalized(Artifact::new("html", "https://x.example.com/"));
        merge_into(&mut stored, normalized(Artifact::new("html", "https://x.example.com/").with_up(false)));
        assert!(!stored.up);
        merge_into(&mut stored, normalized(Artifact::new("html", "https://x.example.com/")));
        assert!(!stored.up, "up never recovers once down");
    }

    #[test]
    fn merge_keeps_older_first_seen() {
        let mut stored = normalized(Artifact::new("domain", "example.com"));
        stored.first_seen = "2024-10-13T19:00:00Z".to_string();
        let incoming = normalized(Artifact::new("domain", "example.com"));
        merge_into(&mut stored, incoming);
        assert_eq!(stored.first_seen, "2024-10-13T19:00:00Z");
        assert_eq!(stored.last_seen, "2024-10-13T19:29:44Z");
    }

    #[test]
    fn merge_metadata_first_writer_wins() {
        let mut stored = normalized(Artifact::new("html", "https://x.example.com/").with_meta("status", 200));
        merge_into(
            &mut stored,
            normalized(Artifact::new("html", "https://x.example.com/").with_meta("status", 404)),
        );
        assert_eq!(stored.metadata["status"], 200);
    }

    #[test]
    fn merge_raw_accumulates_scalars_into_a_list() {
        let mut stored = normalized(Artifact::new("js", "https://x.example.com/a").with_meta("raw", "line one"));
        merge_into(
            &mut stored,
            normalized(Artifact::new("js", "https://x.example.com/a").with_meta("raw", "line two")),
        );
        assert_eq!(
            stored.metadata["raw"],
            serde_json::json!(["line one", "line two"])
        );
    }

    #[test]
    fn merge_raw_handles_mixed_scalar_and_list() {
        let mut stored = normalized(
            Artifact::new("js", "https://x.example.com/a")
                .with_meta("raw", serde_json::json!(["a", "b"])),
        );
        merge_into(
            &mut stored,
            normalized(Artifact::new("js", "https://x.example.com/a").with_meta("raw", "b")),
        );
        assert_eq!(stored.metadata["raw"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn merge_raw_single_line_stays_scalar() {
        let mut stored = normalized(Artifact::new("js", "https://x.example.com/a").with_meta("raw", "same"));
        merge_into(
            &mut stored,
            normalized(Artifact::new("js", "https://x.example.com/a").with_meta("raw", "same")),
        );
        assert_eq!(stored.metadata["raw"], serde_json::json!("same"));
    }
}

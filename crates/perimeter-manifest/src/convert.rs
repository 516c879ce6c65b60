//! Bidirectional mapping between the verbose v1 model and compact v2
//! records.
//!
//! Compaction hoists well-known metadata into typed sub-objects
//! (certificates, gf findings), folds the two booleans into a state enum,
//! and turns absolute timestamps into millisecond offsets from the header
//! base. Expansion inverts all of it; the round trip is value-equivalent
//! modulo millisecond quantization and the hoisted fields.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use perimeter_model::{Artifact, CertRecord, MODEL_VERSION};

use crate::aliases::{compact_issuer, expand_issuer};
use crate::error::ManifestError;
use crate::v2::{ArtifactV2, CertificateV2, GfFindingV2, StateV2};

/// Context longer than this is dropped from compact gf findings.
const MAX_CONTEXT_LEN: usize = 200;

/// Metadata keys hoisted into the compact gf-finding value.
const GF_KEYS: &[&str] = &["resource", "evidence", "line", "context", "rules"];

/// Compact a v1 artifact into its on-disk record.
pub fn to_v2(artifact: &Artifact, base: DateTime<Utc>) -> Result<ArtifactV2, ManifestError> {
    let mut metadata = artifact.metadata.clone();

    let value = match artifact.artifact_type.as_str() {
        "certificate" => compact_certificate(artifact, &mut metadata),
        "gfFinding" => compact_gf_finding(artifact, &mut metadata),
        _ => Value::String(artifact.value.clone()),
    };

    let first = parse_ts(&artifact.first_seen)?;
    let first_ms = (first - base).num_milliseconds();
    let timestamps = if artifact.last_seen.is_empty() {
        vec![first_ms]
    } else {
        let last_ms = (parse_ts(&artifact.last_seen)? - base).num_milliseconds();
        if last_ms == first_ms {
            vec![first_ms]
        } else {
            vec![first_ms, last_ms]
        }
    };

    Ok(ArtifactV2 {
        artifact_type: artifact.artifact_type.clone(),
        value,
        state: StateV2::from_flags(artifact.active, artifact.up),
        tool: artifact.tool.clone(),
        tools: artifact.tools.iter().cloned().collect(),
        occurrences: artifact.occurrences,
        timestamps,
        types: artifact.types.iter().cloned().collect(),
        metadata,
    })
}

/// Expand an on-disk record back into the verbose model. `aliases` is the
/// header's alias map; the built-in table backs it up.
#[must_use]
pub fn to_v1(
    record: &ArtifactV2,
    base: DateTime<Utc>,
    aliases: &BTreeMap<String, String>,
) -> Artifact {
    let (active, up) = record.state.flags();
    let mut metadata = record.metadata.clone();

    let value = match &record.value {
        Value::Object(obj) if obj.contains_key("cn") && obj.contains_key("iss") => {
            expand_certificate(&record.value, aliases, &mut metadata)
        }
        Value::Object(obj) if obj.contains_key("res") && obj.contains_key("ev") => {
            expand_gf_finding(&record.value, &mut metadata)
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let first = base + Duration::milliseconds(record.timestamps.first().copied().unwrap_or(0));
    let last = match record.timestamps.get(1) {
        Some(offset) => base + Duration::milliseconds(*offset),
        None => first,
    };

    let mut tools: std::collections::BTreeSet<String> = record.tools.iter().cloned().collect();
    if tools.is_empty() && !record.tool.is_empty() {
        tools.insert(record.tool.clone());
    }

    Artifact {
        artifact_type: record.artifact_type.clone(),
        types: record.types.iter().cloned().collect(),
        value,
        active,
        up,
        tool: record.tool.clone(),
        tools,
        occurrences: record.occurrences,
        first_seen: fmt_ts(first),
        last_seen: fmt_ts(last),
        metadata,
        version: MODEL_VERSION.to_string(),
    }
}

fn compact_certificate(artifact: &Artifact, metadata: &mut BTreeMap<String, Value>) -> Value {
    let Ok(record) = serde_json::from_str::<CertRecord>(&artifact.value) else {
        // Not a structured certificate value; store verbatim.
        return Value::String(artifact.value.clone());
    };
    let hoisted_source = match metadata.remove("source") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    let compact = CertificateV2 {
        cn: record.common_name.clone(),
        dns: record.dns_names.clone(),
        iss: compact_issuer(&record.issuer)
            .map_or_else(|| record.issuer.clone(), str::to_string),
        nb: date_only(&record.not_before),
        na: date_only(&record.not_after),
        sn: compact_serial(&record.serial_number),
        source: record.source.clone().or(hoisted_source),
    };
    serde_json::to_value(compact).unwrap_or_else(|_| Value::String(artifact.value.clone()))
}

fn expand_certificate(
    value: &Value,
    aliases: &BTreeMap<String, String>,
    metadata: &mut BTreeMap<String, Value>,
) -> String {
    let Ok(compact) = serde_json::from_value::<CertificateV2>(value.clone()) else {
        return value.to_string();
    };
    if let Some(source) = &compact.source {
        metadata.insert("source".to_string(), Value::String(source.clone()));
    }
    let issuer = aliases
        .get(&compact.iss)
        .cloned()
        .or_else(|| expand_issuer(&compact.iss).map(str::to_string))
        .unwrap_or_else(|| compact.iss.clone());
    let record = CertRecord {
        common_name: compact.cn,
        dns_names: compact.dns,
        issuer,
        not_before: expand_date(&compact.nb),
        not_after: expand_date(&compact.na),
        serial_number: compact.sn,
        source: None,
    };
    record
        .marshal()
        .unwrap_or_else(|_| value.to_string())
}

fn compact_gf_finding(artifact: &Artifact, metadata: &mut BTreeMap<String, Value>) -> Value {
    let resource = metadata.get("resource").and_then(Value::as_str);
    let evidence = metadata.get("evidence").and_then(Value::as_str);
    let (Some(res), Some(ev)) = (resource, evidence) else {
        return Value::String(artifact.value.clone());
    };

    let compact = GfFindingV2 {
        res: res.to_string(),
        ev: ev.to_string(),
        l: metadata.get("line").and_then(Value::as_u64),
        ctx: metadata
            .get("context")
            .and_then(Value::as_str)
            .filter(|ctx| ctx.len() <= MAX_CONTEXT_LEN)
            .map(str::to_string),
        r: metadata
            .get("rules")
            .and_then(Value::as_array)
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    };
    for key in GF_KEYS {
        metadata.remove(*key);
    }
    serde_json::to_value(compact).unwrap_or_else(|_| Value::String(artifact.value.clone()))
}

fn expand_gf_finding(value: &Value, metadata: &mut BTreeMap<String, Value>) -> String {
    let Ok(compact) = serde_json::from_value::<GfFindingV2>(value.clone()) else {
        return value.to_string();
    };
    metadata.insert("resource".to_string(), Value::String(compact.res.clone()));
    metadata.insert("evidence".to_string(), Value::String(compact.ev.clone()));
    if let Some(line) = compact.l {
        metadata.insert("line".to_string(), Value::from(line));
    }
    if let Some(ctx) = &compact.ctx {
        metadata.insert("context".to_string(), Value::String(ctx.clone()));
    }
    if !compact.r.is_empty() {
        metadata.insert(
            "rules".to_string(),
            Value::Array(compact.r.iter().cloned().map(Value::String).collect()),
        );
    }
    match compact.l {
        Some(line) => format!("{}:#{} -> {}", compact.res, line, compact.ev),
        None => format!("{} -> {}", compact.res, compact.ev),
    }
}

/// Strip one `00` prefix and cut to 16 hex characters.
fn compact_serial(serial: &str) -> String {
    let trimmed = serial.strip_prefix("00").unwrap_or(serial);
    trimmed.chars().take(16).collect()
}

/// `2025-09-14T16:05:09Z` → `2025-09-14`.
fn date_only(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) if ts.len() >= 10 => ts[..10].to_string(),
        Err(_) => ts.to_string(),
    }
}

/// `2025-09-14` → `2025-09-14T00:00:00Z`; anything else passes through.
fn expand_date(date: &str) -> String {
    if date.len() == 10 && date.as_bytes()[4] == b'-' && date.as_bytes()[7] == b'-' {
        format!("{date}T00:00:00Z")
    } else {
        date.to_string()
    }
}

fn parse_ts(ts: &str) -> Result<DateTime<Utc>, ManifestError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ManifestError::Timestamp {
            value: ts.to_string(),
        })
}

fn fmt_ts(dt: DateTime<Utc>) -> String {
    let format = if dt.timestamp_subsec_millis() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Millis
    };
    dt.to_rfc3339_opts(format, true)
}

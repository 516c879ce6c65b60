//! crt.sh certificate-transparency source.
//!
//! Queries the crt.sh JSON endpoint for every certificate logged against
//! the target and its subdomains, and rewrites each entry as a `cert:`
//! line for the sink. With this source a bare install with none of the
//! external tools present still produces findings.

use anyhow::{Context as _, Result};
use serde::Deserialize;

use perimeter_model::CertRecord;

const ENDPOINT: &str = "https://crt.sh/";

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    #[serde(default)]
    common_name: String,
    /// Newline-separated SANs.
    #[serde(default)]
    name_value: String,
    #[serde(default)]
    issuer_name: String,
    #[serde(default)]
    not_before: String,
    #[serde(default)]
    not_after: String,
    #[serde(default)]
    serial_number: String,
}

/// Fetch logged certificates for a target and render them as `cert:`
/// lines.
pub async fn fetch(client: &reqwest::Client, target: &str) -> Result<Vec<String>> {
    let entries: Vec<CrtShEntry> = client
        .get(ENDPOINT)
        .query(&[("q", format!("%.{target}")), ("output", "json".to_string())])
        .send()
        .await
        .context("crt.sh request failed")?
        .error_for_status()
        .context("crt.sh returned an error status")?
        .json()
        .await
        .context("crt.sh returned malformed JSON")?;

    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(line) = to_cert_line(&entry) {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn to_cert_line(entry: &CrtShEntry) -> Option<String> {
    let record = CertRecord {
        common_name: entry.common_name.clone(),
        dns_names: entry
            .name_value
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        issuer: entry.issuer_name.clone(),
        not_before: rfc3339(&entry.not_before),
        not_after: rfc3339(&entry.not_after),
        serial_number: entry.serial_number.clone(),
        source: Some("crtsh".to_string()),
    };
    if record.common_name.is_empty() && record.dns_names.is_empty() {
        return None;
    }
    record.marshal().ok().map(|json| format!("cert: {json}"))
}

/// crt.sh emits naive timestamps (`2025-09-14T16:05:09`); the pipeline
/// speaks RFC 3339 UTC.
fn rfc3339(ts: &str) -> String {
    if ts.is_empty() || ts.ends_with('Z') {
        ts.to_string()
    } else {
        format!("{ts}Z")
    }
}

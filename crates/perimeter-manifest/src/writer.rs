//! Manifest serialization: one header line, one record line per artifact.
//!
//! Because merges mutate existing records, the file is rewritten whole on
//! every flush rather than appended; the write goes through the atomic
//! temp-then-rename helper so readers never see a torn file.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use perimeter_model::Artifact;
use perimeter_utils::write_file_atomic;

use crate::aliases::expand_issuer;
use crate::convert::to_v2;
use crate::error::ManifestError;
use crate::v2::{HeaderV2, SCHEMA_VERSION};

/// Serializes the store's records into `artifacts.jsonl`.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    path: Utf8PathBuf,
    base_time: DateTime<Utc>,
    target: String,
    tools: Vec<String>,
}

impl ManifestWriter {
    #[must_use]
    pub fn new(
        path: Utf8PathBuf,
        base_time: DateTime<Utc>,
        target: impl Into<String>,
        tools: Vec<String>,
    ) -> Self {
        Self {
            path,
            base_time,
            target: target.into(),
            tools,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    #[must_use]
    pub fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    /// Rewrite the manifest with the given artifacts.
    ///
    /// Serialization failures abort the write and surface the offending
    /// value; a manifest must never silently lose records.
    pub fn write_all(&self, artifacts: &[Artifact]) -> Result<(), ManifestError> {
        let mut records = Vec::with_capacity(artifacts.len());
        let mut aliases = BTreeMap::new();

        for artifact in artifacts {
            let record = to_v2(artifact, self.base_time)?;
            if let Some(alias) = record.value.get("iss").and_then(|v| v.as_str())
                && let Some(full) = expand_issuer(alias)
            {
                aliases.insert(alias.to_string(), full.to_string());
            }
            records.push(record);
        }

        let header = HeaderV2 {
            schema: SCHEMA_VERSION.to_string(),
            base: self.base_time.timestamp(),
            target: self.target.clone(),
            tools: self.tools.clone(),
            aliases,
        };

        let mut content = String::new();
        content.push_str(&serde_json::to_string(&header).map_err(|e| {
            ManifestError::Serialize {
                value: "<header>".to_string(),
                reason: e.to_string(),
            }
        })?);
        content.push('\n');

        for record in &records {
            let line = serde_json::to_string(record).map_err(|e| ManifestError::Serialize {
                value: record.artifact_type.clone(),
                reason: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        write_file_atomic(&self.path, content.as_bytes()).map_err(|e| ManifestError::Write {
            path: self.path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn writer_in(dir: &TempDir) -> ManifestWriter {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
        ManifestWriter::new(
            path,
            Utc.timestamp_opt(1_728_848_984, 0).unwrap(),
            "example.com",
            vec!["subfinder".into()],
        )
    }

    fn stamped(mut artifact: Artifact) -> Artifact {
        artifact.first_seen = "2024-10-13T19:29:44Z".to_string();
        artifact.occurrences = 1;
        artifact
    }

    #[test]
    fn header_is_the_first_line() {
        let dir = TempDir::new().unwrap();
        let writer = writer_in(&dir);
        writer
            .write_all(&[stamped(Artifact::new("domain", "example.com"))])
            .unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let mut lines = content.lines();
        let header: HeaderV2 = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(header.schema, "2.0");
        assert_eq!(header.base, 1_728_848_984);
        assert_eq!(header.target, "example.com");
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn used_issuer_aliases_land_in_the_header() {
        let dir = TempDir::new().unwrap();
        let writer = writer_in(&dir);
        let cert = stamped(Artifact::new(
            "certificate",
            r#"{"common_name":"example.com","issuer":"C=US, O=Let's Encrypt, CN=R3","not_before":"2025-01-01T00:00:00Z","not_after":"2025-02-01T00:00:00Z","serial_number":"ab"}"#,
        ));
        writer.write_all(&[cert]).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let header: HeaderV2 = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(
            header.aliases.get("LE_R3").map(String::as_str),
            Some("C=US, O=Let's Encrypt, CN=R3")
        );
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let writer = writer_in(&dir);

        writer
            .write_all(&[
                stamped(Artifact::new("domain", "a.example.com")),
                stamped(Artifact::new("domain", "b.example.com")),
            ])
            .unwrap();
        writer
            .write_all(&[stamped(Artifact::new("domain", "a.example.com"))])
            .unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn unstamped_artifacts_fail_the_write() {
        let dir = TempDir::new().unwrap();
        let writer = writer_in(&dir);
        let result = writer.write_all(&[Artifact::new("domain", "example.com")]);
        assert!(matches!(result, Err(ManifestError::Timestamp { .. })));
    }
}

//! Whole-file round trips: what the writer serializes, the reader must
//! reconstruct value-equivalently.

use camino::Utf8PathBuf;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use perimeter_manifest::{ManifestReader, ManifestWriter};
use perimeter_model::{Artifact, MODEL_VERSION};

fn stamped(mut artifact: Artifact, first: &str, last: &str) -> Artifact {
    artifact.first_seen = first.to_string();
    artifact.last_seen = last.to_string();
    artifact.occurrences = 1;
    artifact.version = MODEL_VERSION.to_string();
    if !artifact.tool.is_empty() {
        artifact.tools.insert(artifact.tool.clone());
    }
    artifact
}

#[test]
fn mixed_artifact_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
    let base = Utc.timestamp_opt(1_728_848_984, 0).unwrap();

    let originals = vec![
        stamped(
            Artifact::new("domain", "app.example.com").with_tool("subfinder"),
            "2024-10-13T19:29:44Z",
            "2024-10-13T19:29:44Z",
        ),
        stamped(
            Artifact::new("js", "https://app.example.com/app.js")
                .with_secondary("route")
                .with_active(true)
                .with_tool("httpx")
                .with_meta("status", 200),
            "2024-10-13T19:29:44Z",
            "2024-10-13T19:30:44Z",
        ),
        stamped(
            Artifact::new("html", "https://down.example.com")
                .with_active(true)
                .with_up(false)
                .with_meta("status", 0),
            "2024-10-13T19:29:44Z",
            "2024-10-13T19:29:44Z",
        ),
        stamped(
            Artifact::new("meta", "scan started"),
            "2024-10-13T19:29:44Z",
            "2024-10-13T19:29:44Z",
        ),
    ];

    let writer = ManifestWriter::new(path.clone(), base, "example.com", vec!["subfinder".into()]);
    writer.write_all(&originals).unwrap();

    let reader = ManifestReader::open(&path).unwrap();
    assert_eq!(reader.header().base, 1_728_848_984);
    let restored = reader.read_all().unwrap();

    assert_eq!(restored, originals);
}

#[test]
fn certificate_round_trip_is_equivalent_modulo_hoisting() {
    let dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
    let base = Utc.timestamp_opt(1_728_848_984, 0).unwrap();

    let cert_value = r#"{"common_name":"example.com","dns_names":["example.com","www.example.com"],"issuer":"C=US, O=Google Trust Services, CN=WR3","not_before":"2025-09-14T00:00:00Z","not_after":"2025-12-13T00:00:00Z","serial_number":"18b68e9a192e3874"}"#;
    let original = stamped(
        Artifact::new("certificate", cert_value).with_tool("crtsh"),
        "2024-10-13T19:29:44Z",
        "2024-10-13T19:29:44Z",
    );

    let writer = ManifestWriter::new(path.clone(), base, "example.com", vec![]);
    writer.write_all(std::slice::from_ref(&original)).unwrap();

    let restored = ManifestReader::open(&path)
        .unwrap()
        .read_all()
        .unwrap()
        .remove(0);

    // Midnight validity bounds and an already-compact serial survive the
    // date and serial compaction exactly.
    assert_eq!(restored, original);
}

#[test]
fn timestamp_compaction_matches_header_base() {
    let dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
    let base = Utc.timestamp_opt(1_728_848_984, 0).unwrap();

    let writer = ManifestWriter::new(path.clone(), base, "example.com", vec![]);
    writer
        .write_all(&[stamped(
            Artifact::new("domain", "example.com"),
            "2024-10-13T19:29:44Z",
            "2024-10-13T19:30:44Z",
        )])
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let record: serde_json::Value =
        serde_json::from_str(content.lines().nth(1).unwrap()).unwrap();
    assert_eq!(record["ts"], serde_json::json!([0, 60000]));
}

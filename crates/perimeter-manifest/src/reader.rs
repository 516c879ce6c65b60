//! Manifest deserialization: header first, then a record iterator.

use camino::Utf8Path;
use chrono::{DateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};

use perimeter_model::Artifact;

use crate::convert::to_v1;
use crate::error::ManifestError;
use crate::v2::{ArtifactV2, HeaderV2, SCHEMA_VERSION};

/// Streaming reader over a v2 manifest. Iterates artifacts in file order;
/// end of file ends the iterator, it is not an error.
#[derive(Debug)]
pub struct ManifestReader {
    header: HeaderV2,
    base_time: DateTime<Utc>,
    lines: Lines<BufReader<File>>,
}

impl ManifestReader {
    /// Open a manifest, consuming the first non-empty line as the header.
    pub fn open(path: &Utf8Path) -> Result<Self, ManifestError> {
        let file = File::open(path.as_std_path())?;
        let mut lines = BufReader::new(file).lines();

        let header_line = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(ManifestError::MissingHeader),
            }
        };

        let header: HeaderV2 =
            serde_json::from_str(&header_line).map_err(|e| ManifestError::MalformedRecord {
                reason: format!("header: {e}"),
            })?;
        if header.schema != SCHEMA_VERSION {
            return Err(ManifestError::SchemaMismatch {
                found: header.schema,
            });
        }

        let base_time = Utc
            .timestamp_opt(header.base, 0)
            .single()
            .ok_or_else(|| ManifestError::Timestamp {
                value: header.base.to_string(),
            })?;

        Ok(Self {
            header,
            base_time,
            lines,
        })
    }

    #[must_use]
    pub fn header(&self) -> &HeaderV2 {
        &self.header
    }

    #[must_use]
    pub fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    /// Read every remaining artifact into memory.
    pub fn read_all(self) -> Result<Vec<Artifact>, ManifestError> {
        self.collect()
    }
}

impl Iterator for ManifestReader {
    type Item = Result<Artifact, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str::<ArtifactV2>(&line)
                    .map(|record| to_v1(&record, self.base_time, &self.header.aliases))
                    .map_err(|e| ManifestError::MalformedRecord {
                        reason: e.to_string(),
                    }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_header_and_records() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            concat!(
                "{\"$\":\"2.0\",\"@\":1728848984,\"target\":\"example.com\"}\n",
                "{\"t\":\"domain\",\"v\":\"a.example.com\",\"st\":\"up\",\"n\":1,\"ts\":[0]}\n",
                "{\"t\":\"domain\",\"v\":\"b.example.com\",\"st\":\"up\",\"n\":2,\"ts\":[0,60000]}\n",
            ),
        );

        let reader = ManifestReader::open(&path).unwrap();
        assert_eq!(reader.header().target, "example.com");

        let artifacts = reader.read_all().unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].value, "a.example.com");
        assert_eq!(artifacts[0].first_seen, "2024-10-13T19:29:44Z");
        assert_eq!(artifacts[1].last_seen, "2024-10-13T19:30:44Z");
    }

    #[test]
    fn schema_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "{\"$\":\"1.0\",\"@\":0,\"target\":\"x.example\"}\n");
        let err = ManifestReader::open(&path).unwrap_err();
        assert!(matches!(err, ManifestError::SchemaMismatch { found } if found == "1.0"));
    }

    #[test]
    fn empty_file_is_missing_header() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "");
        assert!(matches!(
            ManifestReader::open(&path),
            Err(ManifestError::MissingHeader)
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            concat!(
                "\n",
                "{\"$\":\"2.0\",\"@\":1728848984,\"target\":\"example.com\"}\n",
                "\n",
                "{\"t\":\"meta\",\"v\":\"run started\",\"st\":\"up\",\"n\":1,\"ts\":[0]}\n",
                "\n",
            ),
        );

        let artifacts = ManifestReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_type, "meta");
    }

    #[test]
    fn malformed_record_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            concat!(
                "{\"$\":\"2.0\",\"@\":1728848984,\"target\":\"example.com\"}\n",
                "not json\n",
            ),
        );

        let mut reader = ManifestReader::open(&path).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(ManifestError::MalformedRecord { .. }))
        ));
    }
}

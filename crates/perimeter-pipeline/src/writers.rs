//! Raw-line writer slots.
//!
//! Beyond the manifest, each artifact type appends the raw accepted lines
//! to a plain text file under the output root (`routes/js.txt`,
//! `dns/records.txt`, ...). Files open lazily on first write and stay open
//! for the scan.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

use perimeter_model::TypeEntry;

pub struct LineWriters {
    root: Utf8PathBuf,
    files: Mutex<HashMap<Utf8PathBuf, File>>,
}

impl LineWriters {
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            files: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Append one raw line to the entry's slot file. Slot I/O is ambient
    /// output; failures are logged and never fail the pipeline.
    pub fn write_line(&self, entry: &TypeEntry, line: &str) {
        let path = self.slot_path(entry);
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        if !files.contains_key(&path) {
            if let Some(parent) = path.parent()
                && let Err(e) = std::fs::create_dir_all(parent.as_std_path())
            {
                warn!(%path, error = %e, "cannot create writer slot directory");
                return;
            }
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(path.as_std_path())
            {
                Ok(file) => {
                    files.insert(path.clone(), file);
                }
                Err(e) => {
                    warn!(%path, error = %e, "cannot open writer slot");
                    return;
                }
            }
        }
        if let Some(file) = files.get_mut(&path)
            && let Err(e) = writeln!(file, "{line}")
        {
            warn!(%path, error = %e, "writer slot append failed");
        }
    }

    fn slot_path(&self, entry: &TypeEntry) -> Utf8PathBuf {
        if entry.output_dir.is_empty() {
            self.root.join(entry.output_file)
        } else {
            self.root.join(entry.output_dir).join(entry.output_file)
        }
    }
}

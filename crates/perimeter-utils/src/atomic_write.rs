//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! The manifest is rewritten wholesale on every flush; a reader must never
//! observe a half-written file. Writing to a sibling temp file and renaming
//! over the target keeps the visible file complete at all times.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`.
///
/// The temp file is created in the target's parent directory so the final
/// rename stays on one filesystem.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory: {parent}"))?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("failed to create temporary file in: {temp_dir}"))?;

    temp_file
        .write_all(content)
        .context("failed to write temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("failed to atomically replace: {path}"))?;

    Ok(())
}

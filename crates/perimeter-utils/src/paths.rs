//! Path helpers shared across the workspace.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

/// Create a directory and all of its parents, tolerating concurrent
/// creation by another worker.
pub fn ensure_dir_all(path: &Utf8Path) -> Result<()> {
    match fs::create_dir_all(path.as_std_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to create directory: {path}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("a/b/c")).unwrap();

        ensure_dir_all(&path).unwrap();

        assert!(path.is_dir());
    }

    #[test]
    fn existing_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        ensure_dir_all(&path).unwrap();
        ensure_dir_all(&path).unwrap();
    }
}

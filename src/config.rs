//! Configuration: `.perimeter/config.toml`, discovered by searching
//! upward from the working directory. Precedence is CLI flags > config
//! file > built-in defaults; the merge itself happens in the CLI layer.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".perimeter";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanDefaults,
}

/// `[scan]` section: defaults for the scan subcommand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanDefaults {
    /// `domain` or `subdomains`.
    pub mode: Option<String>,
    pub workers: Option<usize>,
    pub flush_interval_secs: Option<u64>,
    /// Output directory; `{target}` expands to the normalized target.
    pub output: Option<String>,
    /// Tool allowlist by catalog name.
    pub tools: Option<Vec<String>>,
}

impl Config {
    /// Load an explicit config file, or discover one by walking up from
    /// the current directory. No file at all is not an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let mut dir = std::env::current_dir().context("cannot determine working directory")?;
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(mode) = &self.scan.mode
            && mode != "domain"
            && mode != "subdomains"
        {
            bail!("scan.mode must be \"domain\" or \"subdomains\", got {mode:?}");
        }
        if self.scan.workers == Some(0) {
            bail!("scan.workers must be at least 1");
        }
        Ok(())
    }

    /// Best-effort discovery path, for diagnostics.
    #[must_use]
    pub fn discovered_path(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

//! The external tool catalog.
//!
//! Each entry is an argv template for one supported discovery tool. The
//! orchestrator spawns whichever of these are installed; a missing binary
//! degrades the scan, it never fails it.

/// One supported external tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub binary: &'static str,
    /// Argv template; `{target}` expands to the scope target.
    pub args: &'static [&'static str],
    /// Whether this tool contacts the target directly. Its lines carry
    /// the `active:` flag and it only runs when the scan is active.
    pub active: bool,
}

pub const CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "subfinder",
        binary: "subfinder",
        args: &["-d", "{target}", "-silent", "-all"],
        active: false,
    },
    ToolSpec {
        name: "assetfinder",
        binary: "assetfinder",
        args: &["--subs-only", "{target}"],
        active: false,
    },
    ToolSpec {
        name: "findomain",
        binary: "findomain",
        args: &["--quiet", "-t", "{target}"],
        active: false,
    },
    ToolSpec {
        name: "gau",
        binary: "gau",
        args: &["--subs", "{target}"],
        active: false,
    },
    ToolSpec {
        name: "waybackurls",
        binary: "waybackurls",
        args: &["{target}"],
        active: false,
    },
    ToolSpec {
        name: "dnsx",
        binary: "dnsx",
        args: &["-d", "{target}", "-silent", "-resp"],
        active: true,
    },
    ToolSpec {
        name: "httpx",
        binary: "httpx",
        args: &[
            "-u",
            "{target}",
            "-silent",
            "-status-code",
            "-title",
            "-content-type",
            "-no-color",
        ],
        active: true,
    },
];

impl ToolSpec {
    /// Expand the argv template for a concrete target.
    #[must_use]
    pub fn argv(&self, target: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{target}", target))
            .collect()
    }
}

/// The catalog entries selected by an optional allowlist, filtered to the
/// scan mode.
pub fn selected(allowlist: Option<&[String]>, active_mode: bool) -> Vec<&'static ToolSpec> {
    CATALOG
        .iter()
        .filter(|tool| active_mode || !tool.active)
        .filter(|tool| {
            allowlist.is_none_or(|names| names.iter().any(|name| name == tool.name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_expands_the_target() {
        let subfinder = CATALOG.iter().find(|t| t.name == "subfinder").unwrap();
        assert_eq!(
            subfinder.argv("example.com"),
            vec!["-d", "example.com", "-silent", "-all"]
        );
    }

    #[test]
    fn passive_scans_exclude_active_tools() {
        let tools = selected(None, false);
        assert!(tools.iter().all(|t| !t.active));
        assert!(tools.iter().any(|t| t.name == "subfinder"));
    }

    #[test]
    fn active_scans_include_probes() {
        let tools = selected(None, true);
        assert!(tools.iter().any(|t| t.name == "httpx"));
    }

    #[test]
    fn allowlist_filters_by_name() {
        let names = vec!["gau".to_string()];
        let tools = selected(Some(&names), true);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "gau");
    }
}

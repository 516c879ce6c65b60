//! Command-line interface for perimeter.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use perimeter_scope::ScopeMode;
use perimeter_utils::init_tracing;

use crate::config::Config;
use crate::orchestrator::{ScanOptions, ScanReport, run_scan};
use crate::tools;

/// perimeter, a passive-reconnaissance orchestrator
#[derive(Parser)]
#[command(name = "perimeter")]
#[command(about = "Run passive discovery tools against a target and build an artifact manifest")]
#[command(long_about = r"
perimeter runs external discovery tools concurrently against a target
domain, normalizes their output into deduplicated typed artifacts, and
persists a compact JSONL manifest for downstream analysis.

EXAMPLES:
  # Passive scan of a domain and its subdomains
  perimeter scan example.com

  # Exact-domain scope, explicit output directory
  perimeter scan example.com --mode domain --output ./recon/example

  # Active scan (probing tools run, findings carry the active flag)
  perimeter scan example.com --active

  # Restrict the tool set
  perimeter scan example.com --tools subfinder,gau

  # Show which catalog tools are installed
  perimeter tools

CONFIGURATION:
  Defaults load from .perimeter/config.toml, discovered by searching
  upward from the working directory. Precedence: CLI flags > config
  file > built-in defaults.
")]
#[command(version)]
pub struct Cli {
    /// Path to a configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (handler metrics, debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a target and write its artifact manifest
    Scan {
        /// Target domain or IP
        target: String,

        /// Scope mode: domain (exact) or subdomains
        #[arg(long)]
        mode: Option<String>,

        /// Run active probing tools and mark their findings
        #[arg(long)]
        active: bool,

        /// Sink worker count (default: one per core)
        #[arg(long)]
        workers: Option<usize>,

        /// Output directory ({target} expands to the normalized target)
        #[arg(short, long)]
        output: Option<String>,

        /// Comma-separated tool allowlist
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// Seconds between manifest flushes
        #[arg(long)]
        flush_interval: Option<u64>,

        /// Skip the built-in crt.sh certificate source
        #[arg(long)]
        no_crtsh: bool,
    },
    /// List the tool catalog and which binaries are installed
    Tools,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    // A second init in embedders or tests is harmless.
    let _ = init_tracing(cli.verbose);

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            target,
            mode,
            active,
            workers,
            output,
            tools,
            flush_interval,
            no_crtsh,
        } => {
            let options = scan_options(
                &config, target, mode, active, workers, output, tools, flush_interval, no_crtsh,
            )?;
            debug!(?options, "resolved scan options");

            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("interrupt received, finishing up");
                        cancel.cancel();
                    }
                });
            }

            let report = run_scan(options, cancel).await?;
            print_report(&report, cli.verbose);
        }
        Commands::Tools => {
            for tool in tools::CATALOG {
                let state = if perimeter_runner::is_available(tool.binary) {
                    "installed"
                } else {
                    "missing"
                };
                let kind = if tool.active { "active" } else { "passive" };
                println!("{:<14} {:<8} {}", tool.name, kind, state);
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn scan_options(
    config: &Config,
    target: String,
    mode: Option<String>,
    active: bool,
    workers: Option<usize>,
    output: Option<String>,
    tools: Option<Vec<String>>,
    flush_interval: Option<u64>,
    no_crtsh: bool,
) -> Result<ScanOptions> {
    let mode_name = mode
        .or_else(|| config.scan.mode.clone())
        .unwrap_or_else(|| "subdomains".to_string());
    let mode = ScopeMode::from_str(&mode_name)
        .map_err(|_| anyhow!("invalid scope mode {mode_name:?}; use domain or subdomains"))?;

    let workers = workers
        .or(config.scan.workers)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        })
        .max(1);

    let output_template = output
        .or_else(|| config.scan.output.clone())
        .unwrap_or_else(|| "recon/{target}".to_string());
    let output_dir = Utf8PathBuf::from(output_template.replace("{target}", &target));

    let flush_interval = Duration::from_secs(
        flush_interval
            .or(config.scan.flush_interval_secs)
            .unwrap_or(5),
    );

    Ok(ScanOptions {
        target,
        mode,
        active,
        workers,
        output_dir,
        flush_interval,
        tools: tools.or_else(|| config.scan.tools.clone()),
        crtsh: !no_crtsh,
    })
}

fn print_report(report: &ScanReport, verbose: bool) {
    println!(
        "scan of {} complete: {} artifacts -> {}",
        report.target, report.artifacts, report.manifest
    );
    for outcome in &report.outcomes {
        let mark = if outcome.ok { "ok " } else { "err" };
        println!("  [{mark}] {:<12} {}", outcome.tool, outcome.detail);
    }
    if verbose && !report.metrics.is_empty() {
        println!("handler metrics (avg desc):");
        for stat in &report.metrics {
            println!(
                "  {:<16} {:>8} calls  avg {:>10.1?}  total {:>10.1?}",
                stat.name,
                stat.invocations,
                stat.average(),
                stat.total
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let options = scan_options(
            &Config::default(),
            "example.com".to_string(),
            None,
            false,
            None,
            None,
            None,
            None,
            false,
        )
        .unwrap();

        assert_eq!(options.mode, ScopeMode::Subdomains);
        assert!(options.workers >= 1);
        assert_eq!(options.output_dir, Utf8PathBuf::from("recon/example.com"));
        assert_eq!(options.flush_interval, Duration::from_secs(5));
        assert!(options.crtsh);
    }

    #[test]
    fn cli_flags_override_config() {
        let mut config = Config::default();
        config.scan.mode = Some("subdomains".to_string());
        config.scan.workers = Some(2);

        let options = scan_options(
            &config,
            "example.com".to_string(),
            Some("domain".to_string()),
            true,
            Some(8),
            Some("out/{target}".to_string()),
            Some(vec!["gau".to_string()]),
            Some(30),
            true,
        )
        .unwrap();

        assert_eq!(options.mode, ScopeMode::Domain);
        assert_eq!(options.workers, 8);
        assert_eq!(options.output_dir, Utf8PathBuf::from("out/example.com"));
        assert_eq!(options.flush_interval, Duration::from_secs(30));
        assert_eq!(options.tools.as_deref(), Some(&["gau".to_string()][..]));
        assert!(!options.crtsh);
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let result = scan_options(
            &Config::default(),
            "example.com".to_string(),
            Some("everything".to_string()),
            false,
            None,
            None,
            None,
            None,
            false,
        );
        assert!(result.is_err());
    }
}

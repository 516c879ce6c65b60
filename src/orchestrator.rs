//! Orchestration: spawn every selected tool, wire its stdout into the
//! sink, and drive the scan to a durable manifest.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use camino::Utf8PathBuf;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use perimeter_manifest::ManifestWriter;
use perimeter_pipeline::{Context, HandlerRegistry, HandlerStat, LineWriters, Sink};
use perimeter_scope::{Dedup, Scope, ScopeMode};
use perimeter_store::{ArtifactStore, StoreConfig};

use crate::sources;
use crate::tools::{self, ToolSpec};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target: String,
    pub mode: ScopeMode,
    pub active: bool,
    pub workers: usize,
    pub output_dir: Utf8PathBuf,
    pub flush_interval: Duration,
    /// Tool allowlist by catalog name; `None` runs everything installed.
    pub tools: Option<Vec<String>>,
    /// Whether to query crt.sh alongside the external tools.
    pub crtsh: bool,
}

#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug)]
pub struct ScanReport {
    pub target: String,
    pub artifacts: usize,
    pub manifest: Utf8PathBuf,
    pub outcomes: Vec<ToolOutcome>,
    pub metrics: Vec<HandlerStat>,
}

/// Run one scan to completion: all tools, ingestion, and the final
/// durable flush.
pub async fn run_scan(options: ScanOptions, cancel: CancellationToken) -> Result<ScanReport> {
    let scope = Scope::new(&options.target, options.mode)?;
    let target = scope.target().to_string();
    let selected = tools::selected(options.tools.as_deref(), options.active);

    let mut tool_names: Vec<String> = selected.iter().map(|t| t.name.to_string()).collect();
    if options.crtsh {
        tool_names.push("crtsh".to_string());
    }

    let manifest_path = options.output_dir.join("artifacts.jsonl");
    let writer = ManifestWriter::new(manifest_path.clone(), Utc::now(), &target, tool_names);
    let store = Arc::new(ArtifactStore::new(
        writer,
        StoreConfig {
            flush_interval: options.flush_interval,
            ..StoreConfig::default()
        },
    ));
    let ctx = Context::new(
        Arc::new(scope),
        Arc::new(Dedup::new()),
        Arc::clone(&store),
        Arc::new(LineWriters::new(options.output_dir.clone())),
        options.active,
    );
    let sink = Sink::new(ctx, HandlerRegistry::standard(), options.workers)?;

    sink.sender()
        .send(format!("meta: scan of {target} started"))
        .await;

    let mut outcomes: Vec<ToolOutcome> = Vec::new();
    let mut runs: JoinSet<(String, Result<(), String>)> = JoinSet::new();
    let mut forwarders = Vec::new();

    for tool in selected.iter().copied() {
        match spawn_tool(&sink, tool, &target, &cancel, &mut runs) {
            Ok(mut handles) => forwarders.append(&mut handles),
            Err(outcome) => {
                warn!(tool = %outcome.tool, detail = %outcome.detail, "tool unavailable");
                outcomes.push(outcome);
            }
        }
    }

    if options.crtsh {
        let (tx, forwarder) = sink.tool_sender("crtsh");
        forwarders.push(forwarder);
        let crt_target = target.clone();
        runs.spawn(async move {
            let result = fetch_crtsh(&crt_target, tx).await;
            ("crtsh".to_string(), result)
        });
    }

    // Time-batched flushes while the tools run; the store's own rate
    // limit makes the cadence cheap.
    let ticker_token = cancel.child_token();
    let ticker = {
        let store = Arc::clone(&store);
        let token = ticker_token.clone();
        let interval = options.flush_interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {
                        if let Err(e) = store.flush().await {
                            warn!(error = %e, "periodic flush failed");
                        }
                    }
                }
            }
        })
    };

    while let Some(joined) = runs.join_next().await {
        match joined {
            Ok((tool, Ok(()))) => {
                info!(%tool, "tool completed");
                outcomes.push(ToolOutcome {
                    tool,
                    ok: true,
                    detail: "completed".to_string(),
                });
            }
            Ok((tool, Err(detail))) => {
                warn!(%tool, %detail, "tool failed");
                outcomes.push(ToolOutcome {
                    tool,
                    ok: false,
                    detail,
                });
            }
            Err(join_error) => outcomes.push(ToolOutcome {
                tool: "<unknown>".to_string(),
                ok: false,
                detail: format!("task failed: {join_error}"),
            }),
        }
    }

    ticker_token.cancel();
    let _ = ticker.await;
    for forwarder in forwarders {
        let _ = forwarder.await;
    }

    let metrics = sink.metrics_snapshot();
    sink.close().await?;

    Ok(ScanReport {
        target,
        artifacts: store.len(),
        manifest: manifest_path,
        outcomes,
        metrics,
    })
}

/// Wire one external tool into the sink: resolve it, spawn it, and bridge
/// its stdout through the active-flag adapter into the tool's tagged
/// sub-channel.
fn spawn_tool(
    sink: &Sink,
    tool: &'static ToolSpec,
    target: &str,
    cancel: &CancellationToken,
    runs: &mut JoinSet<(String, Result<(), String>)>,
) -> Result<Vec<tokio::task::JoinHandle<()>>, ToolOutcome> {
    if let Err(e) = perimeter_runner::resolve(tool.binary) {
        return Err(ToolOutcome {
            tool: tool.name.to_string(),
            ok: false,
            detail: e.to_string(),
        });
    }

    let (line_tx, forwarder) = sink.tool_sender(tool.name);
    let (raw_tx, mut raw_rx) = mpsc::channel::<String>(256);
    let active = tool.active;
    let adapter = tokio::spawn(async move {
        while let Some(line) = raw_rx.recv().await {
            let line = if active {
                format!("active: {line}")
            } else {
                line
            };
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let cancel = cancel.clone();
    let name = tool.name.to_string();
    let binary = tool.binary.to_string();
    let argv = tool.argv(target);
    runs.spawn(async move {
        let result = perimeter_runner::run(&cancel, &binary, &argv, raw_tx, None)
            .await
            .map_err(|e| e.to_string());
        (name, result)
    });

    Ok(vec![forwarder, adapter])
}

async fn fetch_crtsh(target: &str, tx: mpsc::Sender<String>) -> Result<(), String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("perimeter/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| e.to_string())?;
    let lines = sources::crtsh::fetch(&client, target)
        .await
        .map_err(|e| format!("{e:#}"))?;
    for line in lines {
        if tx.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

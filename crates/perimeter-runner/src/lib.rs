//! External tool execution.
//!
//! The contract the rest of the system sees is small: resolve a binary,
//! spawn it argv-style (no shell), stream its stdout line by line into a
//! channel, and stop cleanly on cancellation. Everything after the channel
//! belongs to the Sink.

use camino::Utf8Path;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Largest stdout line a tool may emit. Longer lines fail the wrapper.
pub const MAX_LINE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("missing binary {binary:?} (searched: {})", searched_paths.join(", "))]
    MissingBinary {
        binary: String,
        searched_paths: Vec<String>,
    },

    #[error("failed to spawn {binary:?}: {reason}")]
    Spawn { binary: String, reason: String },

    #[error("{binary:?} emitted a line over {limit} bytes")]
    OversizedLine { binary: String, limit: usize },

    #[error("io error on {binary:?} output: {source}")]
    Io {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary:?} exited with {status}")]
    ToolFailed {
        binary: String,
        status: std::process::ExitStatus,
    },
}

/// Resolve a tool binary on `PATH`. The error carries every searched
/// directory so a missing tool is diagnosable from the message alone.
pub fn resolve(binary: &str) -> Result<PathBuf, RunnerError> {
    which::which(binary).map_err(|_| RunnerError::MissingBinary {
        binary: binary.to_string(),
        searched_paths: path_entries(),
    })
}

/// Whether a tool binary is installed.
#[must_use]
pub fn is_available(binary: &str) -> bool {
    which::which(binary).is_ok()
}

/// Run one external tool, streaming its stdout into `out` one line per
/// send. Returns when the tool exits, the token is cancelled, or the
/// receiving side goes away.
pub async fn run(
    cancel: &CancellationToken,
    binary: &str,
    args: &[String],
    out: mpsc::Sender<String>,
    working_dir: Option<&Utf8Path>,
) -> Result<(), RunnerError> {
    let resolved = resolve(binary)?;

    let mut command = Command::new(resolved);
    command
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = working_dir {
        command.current_dir(dir.as_std_path());
    }

    let mut child = command.spawn().map_err(|e| RunnerError::Spawn {
        binary: binary.to_string(),
        reason: e.to_string(),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| RunnerError::Spawn {
        binary: binary.to_string(),
        reason: "stdout not captured".to_string(),
    })?;

    let mut reader = BufReader::new(stdout);
    let mut buf: Vec<u8> = Vec::new();
    let limit = (MAX_LINE_BYTES + 1) as u64;

    loop {
        buf.clear();
        let mut limited = (&mut reader).take(limit);
        let read = tokio::select! {
            () = cancel.cancelled() => {
                debug!(binary, "cancelled, killing tool");
                let _ = child.kill().await;
                return Ok(());
            }
            read = limited.read_until(b'\n', &mut buf) => read,
        };

        let n = read.map_err(|e| RunnerError::Io {
            binary: binary.to_string(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        if buf.len() > MAX_LINE_BYTES {
            let _ = child.kill().await;
            return Err(RunnerError::OversizedLine {
                binary: binary.to_string(),
                limit: MAX_LINE_BYTES,
            });
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if out.send(line.to_string()).await.is_err() {
            // Receiver is gone; nothing left to do but reap the child.
            let _ = child.kill().await;
            return Ok(());
        }
    }

    let status = child.wait().await.map_err(|e| RunnerError::Io {
        binary: binary.to_string(),
        source: e,
    })?;
    if !status.success() {
        return Err(RunnerError::ToolFailed {
            binary: binary.to_string(),
            status,
        });
    }
    Ok(())
}

fn path_entries() -> Vec<String> {
    std::env::var_os("PATH")
        .map(|path| {
            std::env::split_paths(&path)
                .map(|entry| entry.display().to_string())
                .collect()
        })
        .unwrap_or_default()
}

//! The Sink: a worker pool multiplexing per-tool output channels into the
//! handler registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::trace;

use perimeter_store::StoreError;
use perimeter_utils::ensure_dir_all;

use crate::context::Context;
use crate::metrics::HandlerStat;
use crate::registry::HandlerRegistry;

/// Out-of-band tool tag: `\0tool:<name>\0` prepended to a line. Strictly
/// an internal wire format, never written to disk.
const TOOL_TAG: &str = "\u{0}tool:";

/// Tag a line with its producing tool.
#[must_use]
pub fn wrap_with_tool(tool: &str, line: &str) -> String {
    format!("{TOOL_TAG}{tool}\u{0}{line}")
}

fn split_tool_tag(line: &str) -> (&str, &str) {
    if let Some(rest) = line.strip_prefix(TOOL_TAG)
        && let Some((tool, payload)) = rest.split_once('\u{0}')
    {
        (tool, payload)
    } else {
        ("", line)
    }
}

/// A counting handle on the Sink's intake. The pending counter is what
/// lets `flush` wait for true quiescence: lines in the channel plus lines
/// in flight inside workers.
#[derive(Clone)]
pub struct LineSender {
    tx: mpsc::Sender<String>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl LineSender {
    /// Submit one line. Lines sent after close are dropped.
    pub async fn send(&self, line: String) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(line).await.is_err()
            && self.pending.fetch_sub(1, Ordering::SeqCst) == 1
        {
            self.idle.notify_waiters();
        }
    }
}

/// The worker pool consuming tool output lines.
pub struct Sink {
    sender: Option<LineSender>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    ctx: Arc<Context>,
    registry: Arc<HandlerRegistry>,
}

impl Sink {
    /// Spawn `workers` consumers over a line channel sized
    /// `max(1024, 256 × workers)`. Ensures the output root and its `dns/`
    /// subdirectory exist.
    pub fn new(ctx: Context, registry: HandlerRegistry, workers: usize) -> anyhow::Result<Self> {
        let worker_count = workers.max(1);
        let capacity = std::cmp::max(1024, 256 * worker_count);

        ensure_dir_all(ctx.writers.root())?;
        ensure_dir_all(&ctx.writers.root().join("dns"))?;

        let (tx, rx) = mpsc::channel::<String>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let ctx = Arc::new(ctx);
        let registry = Arc::new(registry);
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let handles = (0..worker_count)
            .map(|_| {
                let rx = Arc::clone(&rx);
                let ctx = Arc::clone(&ctx);
                let registry = Arc::clone(&registry);
                let pending = Arc::clone(&pending);
                let idle = Arc::clone(&idle);
                tokio::spawn(async move {
                    loop {
                        let line = { rx.lock().await.recv().await };
                        let Some(line) = line else {
                            break;
                        };
                        process_line(&ctx, &registry, &line).await;
                        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                            idle.notify_waiters();
                        }
                    }
                })
            })
            .collect();

        Ok(Self {
            sender: Some(LineSender {
                tx,
                pending: Arc::clone(&pending),
                idle: Arc::clone(&idle),
            }),
            workers: handles,
            pending,
            idle,
            ctx,
            registry,
        })
    }

    /// A handle for submitting untagged lines.
    #[must_use]
    pub fn sender(&self) -> LineSender {
        self.sender
            .clone()
            .expect("sender taken only by close, which consumes the sink")
    }

    /// A per-tool sub-channel: lines sent into it arrive tagged with the
    /// tool's name. Dropping the returned sender ends the forwarder.
    #[must_use]
    pub fn tool_sender(&self, tool: &str) -> (mpsc::Sender<String>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(256);
        let sender = self.sender();
        let tool = tool.to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                sender.send(wrap_with_tool(&tool, &line)).await;
            }
        });
        (tx, forwarder)
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Per-handler metrics, sorted by descending average latency.
    #[must_use]
    pub fn metrics_snapshot(&self) -> Vec<HandlerStat> {
        self.registry.metrics().snapshot()
    }

    /// Block until the intake is drained and all in-flight lines are
    /// handled, then flush the store.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.drain().await;
        self.ctx.store.flush().await
    }

    /// Close the intake, join the workers, force-flush, and close the
    /// store. Callers must drop their tool senders first or the workers
    /// will wait on them.
    pub async fn close(mut self) -> Result<(), StoreError> {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        self.ctx.store.close().await
    }

    async fn drain(&self) {
        loop {
            // Register for the wakeup before checking the counter, or a
            // notify between the load and the await is lost.
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
    }
}

async fn process_line(ctx: &Context, registry: &HandlerRegistry, raw: &str) {
    let (tool, text) = split_tool_tag(raw);
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let (active, text) = match text.strip_prefix("active:") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    if text.is_empty() {
        return;
    }

    if !registry.dispatch(ctx, text, tool, active).await {
        trace!(tool, line = text, "no handler consumed line");
    }
}

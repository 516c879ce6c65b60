//! The asynchronous front-end: a bounded queue and one drain task in
//! front of the sharded index.
//!
//! Overflow falls back to a synchronous record on the caller's task
//! instead of dropping; losing artifacts under backpressure would corrupt
//! the dedup counts downstream analysis relies on.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use perimeter_manifest::ManifestWriter;
use perimeter_model::Artifact;

use crate::StoreError;
use crate::sharded::{DEFAULT_FLUSH_INTERVAL, DEFAULT_SHARD_COUNT, ShardedStore};

/// Tuning for the store layers.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub shard_count: usize,
    pub queue_capacity: usize,
    pub flush_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            queue_capacity: 8192,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// The store handlers talk to. Cheap to share; `record` never awaits.
pub struct ArtifactStore {
    inner: Arc<ShardedStore>,
    sender: Mutex<Option<mpsc::Sender<(String, Artifact)>>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ArtifactStore {
    /// Build the store and spawn its drain task. Must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn new(writer: ManifestWriter, config: StoreConfig) -> Self {
        let inner = Arc::new(ShardedStore::new(
            writer,
            config.shard_count,
            config.flush_interval,
        ));
        let (tx, mut rx) = mpsc::channel::<(String, Artifact)>(config.queue_capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());

        let worker = {
            let inner = Arc::clone(&inner);
            let pending = Arc::clone(&pending);
            let drained = Arc::clone(&drained);
            tokio::spawn(async move {
                while let Some((tool, artifact)) = rx.recv().await {
                    inner.record(&tool, artifact);
                    if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                        drained.notify_waiters();
                    }
                }
            })
        };

        Self {
            inner,
            sender: Mutex::new(Some(tx)),
            pending: Arc::clone(&pending),
            drained,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue one artifact for indexing. When the queue is full or the
    /// store is closing, the record happens synchronously on this call so
    /// nothing is ever lost.
    pub fn record(&self, tool: &str, artifact: Artifact) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(sender) = sender else {
            self.inner.record(tool, artifact);
            return;
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        match sender.try_send((tool.to_string(), artifact)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full((tool, artifact))) => {
                warn!("store queue full, recording synchronously");
                self.inner.record(&tool, artifact);
                self.settle_one();
            }
            Err(mpsc::error::TrySendError::Closed((tool, artifact))) => {
                self.inner.record(&tool, artifact);
                self.settle_one();
            }
        }
    }

    fn settle_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Wait for the queue to drain, then flush the shards (rate-limited).
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.drain().await;
        self.inner.flush()
    }

    /// Drain, stop the worker, and force a final flush. Total: the store
    /// is durable once this returns.
    pub async fn close(&self) -> Result<(), StoreError> {
        // Dropping the sender lets the worker exit once the queue empties.
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker
            && worker.await.is_err()
        {
            warn!("store worker panicked before close");
        }
        self.drain().await;
        self.inner.force_flush()
    }

    /// Number of distinct records currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copy of the current records, shard by shard.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Artifact> {
        self.inner.snapshot()
    }

    async fn drain(&self) {
        loop {
            // Register for the wakeup before checking the counter, or a
            // notify between the load and the await is lost.
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, config: StoreConfig) -> (ArtifactStore, Utf8PathBuf) {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("artifacts.jsonl")).unwrap();
        let writer = ManifestWriter::new(
            path.clone(),
            Utc.timestamp_opt(1_728_848_984, 0).unwrap(),
            "example.com",
            vec![],
        );
        (ArtifactStore::new(writer, config), path)
    }

    #[tokio::test]
    async fn records_flow_through_the_queue() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(
            &dir,
            StoreConfig {
                flush_interval: Duration::ZERO,
                ..StoreConfig::default()
            },
        );

        for i in 0..100 {
            store.record("t", Artifact::new("domain", format!("h{i}.example.com")));
        }
        store.flush().await.unwrap();

        assert_eq!(store.len(), 100);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 101);
    }

    #[tokio::test]
    async fn queue_overflow_is_lossless() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_in(
            &dir,
            StoreConfig {
                queue_capacity: 1,
                flush_interval: Duration::ZERO,
                ..StoreConfig::default()
            },
        );

        for i in 0..500 {
            store.record("t", Artifact::new("domain", format!("h{i}.example.com")));
        }
        store.flush().await.unwrap();
        assert_eq!(store.len(), 500);
    }

    #[tokio::test]
    async fn close_is_durable_even_inside_the_rate_limit() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(
            &dir,
            StoreConfig {
                flush_interval: Duration::from_secs(3600),
                ..StoreConfig::default()
            },
        );

        store.record("crtsh", Artifact::new("domain", "example.com"));
        store.record("subfinder", Artifact::new("domain", "example.com"));
        store.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        let record: serde_json::Value =
            serde_json::from_str(content.lines().nth(1).unwrap()).unwrap();
        assert_eq!(record["n"], 2);
        assert_eq!(record["tls"], serde_json::json!(["crtsh", "subfinder"]));
    }

    #[tokio::test]
    async fn record_after_close_still_lands() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_in(&dir, StoreConfig::default());

        store.close().await.unwrap();
        store.record("t", Artifact::new("domain", "late.example.com"));
        assert_eq!(store.len(), 1);
    }
}

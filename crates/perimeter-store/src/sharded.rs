//! The sharded in-memory index and its time-batched flush policy.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::debug;

use perimeter_manifest::ManifestWriter;
use perimeter_model::{Artifact, ArtifactKey};

use crate::StoreError;
use crate::merge::{merge_into, normalize};

/// Default shard count; a power of two keeps the hash spread even.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Default minimum interval between manifest rewrites.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ShardInner {
    index: HashMap<ArtifactKey, Artifact>,
    /// Keys in first-record order; merges never reorder.
    order: Vec<ArtifactKey>,
    dirty: bool,
    last_flush: Option<Instant>,
}

struct Shard {
    inner: Mutex<ShardInner>,
}

/// N independent maps composing the store. Record locks exactly one
/// shard; flush snapshots all of them and rewrites the manifest.
pub struct ShardedStore {
    shards: Vec<Shard>,
    writer: ManifestWriter,
    flush_interval: Duration,
}

impl ShardedStore {
    #[must_use]
    pub fn new(writer: ManifestWriter, shard_count: usize, flush_interval: Duration) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Shard {
                inner: Mutex::new(ShardInner::default()),
            })
            .collect();
        Self {
            shards,
            writer,
            flush_interval,
        }
    }

    /// Normalize and index one artifact, merging on key collision.
    pub fn record(&self, tool: &str, artifact: Artifact) {
        let Some(normalized) = normalize(tool, artifact, Utc::now()) else {
            return;
        };
        let key = ArtifactKey::of(&normalized);
        let shard_index = key.shard(&normalized.artifact_type, self.shards.len());

        let mut guard = self.shards[shard_index]
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let shard = &mut *guard;
        match shard.index.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                merge_into(occupied.get_mut(), normalized);
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                shard.order.push(vacant.key().clone());
                vacant.insert(normalized);
            }
        }
        shard.dirty = true;
    }

    /// Number of distinct records across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.inner.lock().unwrap_or_else(|e| e.into_inner()).index.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy every record out, shard by shard, insertion order within each.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Artifact> {
        let mut all = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let inner = shard.inner.lock().unwrap_or_else(|e| e.into_inner());
            for key in &inner.order {
                if let Some(artifact) = inner.index.get(key) {
                    all.push(artifact.clone());
                }
            }
        }
        all
    }

    /// Rate-limited flush: a no-op unless some shard is dirty and either
    /// has never been flushed or was last flushed at least the flush
    /// interval ago.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.flush_inner(false)
    }

    /// Unconditional flush; close calls this so durability never depends
    /// on the rate limiter.
    pub fn force_flush(&self) -> Result<(), StoreError> {
        self.flush_inner(true)
    }

    fn flush_inner(&self, force: bool) -> Result<(), StoreError> {
        let now = Instant::now();
        if !force && !self.flush_due(now) {
            return Ok(());
        }

        let all = self.snapshot();
        debug!(records = all.len(), "flushing manifest");
        self.writer.write_all(&all)?;

        for shard in &self.shards {
            let mut inner = shard.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.dirty = false;
            inner.last_flush = Some(now);
        }
        Ok(())
    }

    fn flush_due(&self, now: Instant) -> bool {
        self.shards.iter().any(|shard| {
            let inner = shard.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.dirty
                && match inner.last_flush {
                    None => true,
                    Some(last) => now.duration_since(last) >= self.flush_interval,
                }
        })
    }
}

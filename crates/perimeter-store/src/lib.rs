//! The artifact store: in-memory consolidation with per-key merging,
//! sharded for concurrency, fronted by an asynchronous write-behind queue,
//! and persisted through the manifest writer.
//!
//! Layering, inside out: [`merge`] holds the pure normalization and merge
//! semantics; [`sharded::ShardedStore`] owns the locked per-shard indexes
//! and the time-batched flush policy; [`store::ArtifactStore`] puts a
//! bounded queue and a drain task in front so handlers never block on the
//! shard locks.

pub mod merge;
pub mod sharded;
pub mod store;

use thiserror::Error;

pub use sharded::ShardedStore;
pub use store::{ArtifactStore, StoreConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("flush failed: {0}")]
    Flush(#[from] perimeter_manifest::ManifestError),
}

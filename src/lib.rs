//! perimeter: passive-reconnaissance orchestrator.
//!
//! Runs external discovery tools concurrently against a target domain,
//! normalizes their heterogeneous textual output into a content-addressed
//! artifact store, and persists a compact append-only manifest
//! (`artifacts.jsonl`) for downstream analysis.
//!
//! The ingestion pipeline itself lives in the member crates; this crate
//! is the CLI surface, configuration layer, tool catalog, and the
//! orchestrator wiring tools into the sink.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod sources;
pub mod tools;

pub use config::Config;
pub use orchestrator::{ScanOptions, ScanReport, run_scan};

// The pipeline types most embedders need, re-exported at the root.
pub use perimeter_manifest::{ManifestReader, ManifestWriter};
pub use perimeter_model::Artifact;
pub use perimeter_pipeline::{Context, HandlerRegistry, Sink};
pub use perimeter_scope::{Scope, ScopeMode};
pub use perimeter_store::{ArtifactStore, StoreConfig};

//! The on-disk manifest format (schema 2.0).
//!
//! `artifacts.jsonl` is newline-delimited JSON: a single [`HeaderV2`]
//! line followed by one compact [`ArtifactV2`] per stored artifact. This
//! crate owns the bidirectional mapping between the verbose in-memory
//! model and the compact records, the issuer alias table, and the
//! writer/reader pair.

pub mod aliases;
pub mod convert;
pub mod error;
pub mod reader;
pub mod v2;
pub mod writer;

pub use aliases::{compact_issuer, expand_issuer};
pub use convert::{to_v1, to_v2};
pub use error::ManifestError;
pub use reader::ManifestReader;
pub use v2::{ArtifactV2, CertificateV2, GfFindingV2, HeaderV2, SCHEMA_VERSION, StateV2};
pub use writer::ManifestWriter;

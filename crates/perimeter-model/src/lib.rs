//! The internal artifact model shared by the ingestion pipeline and the
//! artifact store.
//!
//! An [`Artifact`] is one logical finding in its verbose in-memory form;
//! [`ArtifactKey`] is its dedup identity; the [`registry`] is the static
//! table describing every artifact type the pipeline can emit. The compact
//! on-disk form lives in `perimeter-manifest`.

pub mod artifact;
pub mod cert;
pub mod key;
pub mod registry;

pub use artifact::{Artifact, MODEL_VERSION};
pub use cert::{CertParseError, CertRecord, parse_certificate_line};
pub use key::{ArtifactKey, category_of, fnv32a};
pub use registry::TypeEntry;

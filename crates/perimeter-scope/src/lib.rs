//! Scope, normalization, and dedup for the ingestion pipeline.
//!
//! Everything here is either a pure function over free-text tool output or
//! a small thread-safe set. The handlers in `perimeter-pipeline` lean on
//! this crate to decide, for every line, whether a host or URL belongs to
//! the target's perimeter and whether it has been seen before.

pub mod categories;
pub mod dedup;
pub mod normalize;
pub mod scope;

pub use categories::{Category, detect_categories};
pub use dedup::Dedup;
pub use normalize::{canonical_route_key, normalize_host, parse_status, route_base};
pub use scope::{Scope, ScopeError, ScopeMode};

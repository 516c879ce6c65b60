//! Shared infrastructure for the perimeter workspace.
//!
//! Deliberately small: tracing initialization, atomic file writes, and
//! directory helpers. Domain logic lives in the sibling crates.

pub mod atomic_write;
pub mod logging;
pub mod paths;

pub use atomic_write::write_file_atomic;
pub use logging::init_tracing;
pub use paths::ensure_dir_all;

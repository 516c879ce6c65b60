//! Shared handler context and the per-line view handlers receive.

use std::sync::Arc;

use perimeter_scope::{Dedup, Scope};
use perimeter_store::ArtifactStore;

use crate::writers::LineWriters;

/// Everything a handler needs to turn a line into stored artifacts.
///
/// `active_mode` is the scan-level flag: when set, handlers that observe a
/// host or route through an active probe also cross-promote it into the
/// passive keyspaces so later passive sightings never double-emit.
pub struct Context {
    pub scope: Arc<Scope>,
    pub dedup: Arc<Dedup>,
    pub store: Arc<ArtifactStore>,
    pub writers: Arc<LineWriters>,
    pub active_mode: bool,
}

impl Context {
    #[must_use]
    pub fn new(
        scope: Arc<Scope>,
        dedup: Arc<Dedup>,
        store: Arc<ArtifactStore>,
        writers: Arc<LineWriters>,
        active_mode: bool,
    ) -> Self {
        Self {
            scope,
            dedup,
            store,
            writers,
            active_mode,
        }
    }
}

/// One line as a handler sees it: the text (payload for prefix handlers,
/// the whole line for fallbacks), the producing tool, and whether the line
/// carried the `active:` flag.
#[derive(Debug, Clone, Copy)]
pub struct IncomingLine<'a> {
    pub text: &'a str,
    pub tool: &'a str,
    pub active: bool,
}

impl<'a> IncomingLine<'a> {
    #[must_use]
    pub fn new(text: &'a str, tool: &'a str, active: bool) -> Self {
        Self { text, tool, active }
    }

    /// The same line with different text; used when a handler re-emits
    /// under another prefix.
    #[must_use]
    pub fn with_text(self, text: &'a str) -> Self {
        Self { text, ..self }
    }
}

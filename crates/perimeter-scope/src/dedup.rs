//! Namespaced already-seen tracking.
//!
//! One mutexed map of namespace → key set is enough at the scale a single
//! scan produces; the namespaces themselves (e.g. `route:json:active`)
//! keep unrelated artifact kinds from colliding.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Thread-safe namespaced "seen" set.
#[derive(Debug, Default)]
pub struct Dedup {
    inner: Mutex<HashMap<String, HashSet<String>>>,
}

impl Dedup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `(namespace, key)` and report whether it was already present.
    ///
    /// Empty namespaces or keys are no-ops and always report unseen.
    pub fn seen(&self, namespace: &str, key: &str) -> bool {
        if namespace.is_empty() || key.is_empty() {
            return false;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        !inner
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string())
    }

    /// Mark `(namespace, key)` without caring about prior state.
    pub fn mark(&self, namespace: &str, key: &str) {
        let _ = self.seen(namespace, key);
    }
}

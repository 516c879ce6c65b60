//! Per-handler invocation counts and latency.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// One handler's aggregate in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerStat {
    pub name: String,
    pub invocations: u64,
    pub total: Duration,
}

impl HandlerStat {
    #[must_use]
    pub fn average(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.total / u32::try_from(self.invocations).unwrap_or(u32::MAX)
        }
    }
}

/// Shared counter map, updated on every handle call.
#[derive(Debug, Default)]
pub struct HandlerMetrics {
    inner: Mutex<HashMap<String, (u64, Duration)>>,
}

impl HandlerMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, name: &str, elapsed: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = inner.entry(name.to_string()).or_insert((0, Duration::ZERO));
        entry.0 += 1;
        entry.1 += elapsed;
    }

    /// Copy the counters out, sorted by descending average latency, ties
    /// broken by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HandlerStat> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut stats: Vec<HandlerStat> = inner
            .iter()
            .map(|(name, (invocations, total))| HandlerStat {
                name: name.clone(),
                invocations: *invocations,
                total: *total,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.average()
                .cmp(&a.average())
                .then_with(|| a.name.cmp(&b.name))
        });
        stats
    }
}

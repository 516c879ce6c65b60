//! Prefix-indexed dispatch with an ordered fallback chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::{Context, IncomingLine};
use crate::handlers::{
    CertFallback, CertHandler, DnsHandler, DomainFallback, GfFindingHandler, Handler,
    MetaHandler, MetaHeuristicFallback, RdapHandler, RelationFallback, RouteFallback,
    RouteHandler,
};
use crate::metrics::HandlerMetrics;

/// Wraps a handler and records elapsed time and invocation count on every
/// call.
struct Metered {
    inner: Box<dyn Handler>,
    metrics: Arc<HandlerMetrics>,
}

#[async_trait]
impl Handler for Metered {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        let start = Instant::now();
        let handled = self.inner.handle(ctx, line).await;
        self.metrics.observe(self.inner.name(), start.elapsed());
        handled
    }
}

/// The dispatch table: a map from prefix token to handler plus the
/// ordered fallbacks tried when no prefix matches or the prefix handler
/// declines the line.
pub struct HandlerRegistry {
    prefixed: HashMap<&'static str, Metered>,
    fallbacks: Vec<Metered>,
    metrics: Arc<HandlerMetrics>,
}

/// Route-category prefixes registered against [`RouteHandler`].
const ROUTE_PREFIXES: &[&str] = &[
    "js", "html", "maps", "json", "api", "wasm", "svg", "crawl", "meta-route",
];

impl HandlerRegistry {
    /// The full standard handler set.
    #[must_use]
    pub fn standard() -> Self {
        let metrics = Arc::new(HandlerMetrics::new());
        let meter = |inner: Box<dyn Handler>| Metered {
            inner,
            metrics: Arc::clone(&metrics),
        };

        let mut prefixed: HashMap<&'static str, Metered> = HashMap::new();
        prefixed.insert("dns", meter(Box::new(DnsHandler)));
        prefixed.insert("rdap", meter(Box::new(RdapHandler)));
        prefixed.insert("cert", meter(Box::new(CertHandler)));
        prefixed.insert("gffinding", meter(Box::new(GfFindingHandler)));
        prefixed.insert("meta", meter(Box::new(MetaHandler)));
        for prefix in ROUTE_PREFIXES.iter().copied() {
            prefixed.insert(prefix, meter(Box::new(RouteHandler::new(prefix))));
        }

        let fallbacks = vec![
            meter(Box::new(RelationFallback)),
            meter(Box::new(MetaHeuristicFallback)),
            meter(Box::new(RouteFallback)),
            meter(Box::new(CertFallback)),
            meter(Box::new(DomainFallback)),
        ];

        Self {
            prefixed,
            fallbacks,
            metrics,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<HandlerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Classify and handle one line (tool tag and `active:` flag already
    /// stripped). Returns whether any handler consumed it.
    pub async fn dispatch(&self, ctx: &Context, text: &str, tool: &str, active: bool) -> bool {
        if let Some(index) = text.find(':') {
            let token = text[..index].to_ascii_lowercase();
            if let Some(handler) = self.prefixed.get(token.as_str()) {
                let payload = text[index + 1..].trim();
                if handler
                    .handle(ctx, IncomingLine::new(payload, tool, active))
                    .await
                {
                    return true;
                }
            }
        }

        for handler in &self.fallbacks {
            if handler
                .handle(ctx, IncomingLine::new(text, tool, active))
                .await
            {
                return true;
            }
        }
        false
    }
}

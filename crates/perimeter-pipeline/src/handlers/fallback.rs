//! The ordered fallback chain for unprefixed lines: relation, meta
//! heuristic, route, certificate, domain. The first handler returning
//! `true` wins.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use perimeter_model::{parse_certificate_line, registry};
use perimeter_scope::normalize_host;

use crate::context::{Context, IncomingLine};
use crate::handlers::cert::record_certificate;
use crate::handlers::dns::{DnsPayload, record_dns};
use crate::handlers::meta::record_meta;
use crate::handlers::route::handle_route;
use crate::handlers::{Handler, record_domain};

/// `a (kind) --> TYPE --> b (kind)`, as emitted by graph-shaped resolver
/// output. Rewritten into a synthetic DNS record.
static RELATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<from>\S+)\s+\((?P<from_kind>[^)]*)\)\s+-->\s+(?P<rtype>[A-Za-z]+)\s+-->\s+(?P<to>\S+)\s+\((?P<to_kind>[^)]*)\)$",
    )
    .expect("relation pattern")
});

pub struct RelationFallback;

#[async_trait]
impl Handler for RelationFallback {
    fn name(&self) -> &'static str {
        "relation"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        let Some(captures) = RELATION.captures(line.text.trim()) else {
            return false;
        };
        let payload = DnsPayload {
            host: captures["from"].to_string(),
            record_type: captures["rtype"].to_ascii_uppercase(),
            value: captures["to"].to_string(),
            raw: Some(serde_json::Value::String(line.text.to_string())),
            ptr: None,
        };
        record_dns(ctx, line, &payload);
        true
    }
}

/// Lines that look like relations or annotated graph output but did not
/// parse as one are kept as operational messages.
pub struct MetaHeuristicFallback;

#[async_trait]
impl Handler for MetaHeuristicFallback {
    fn name(&self) -> &'static str {
        "meta-heuristic"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        if !line.text.contains("-->") && !line.text.contains(" (") {
            return false;
        }
        record_meta(ctx, line);
        true
    }
}

/// Anything URL-shaped goes down the plain route path.
pub struct RouteFallback;

#[async_trait]
impl Handler for RouteFallback {
    fn name(&self) -> &'static str {
        "route-fallback"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        if !line.text.contains("://") && !line.text.contains('/') {
            return false;
        }
        let Some(entry) = registry::lookup("route") else {
            return false;
        };
        handle_route(ctx, entry, line).await
    }
}

/// A bare JSON certificate payload without its prefix.
pub struct CertFallback;

#[async_trait]
impl Handler for CertFallback {
    fn name(&self) -> &'static str {
        "cert-fallback"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        let Ok(record) = parse_certificate_line(line.text) else {
            return false;
        };
        record_certificate(ctx, line, &record);
        true
    }
}

/// The last resort: a bare hostname.
pub struct DomainFallback;

#[async_trait]
impl Handler for DomainFallback {
    fn name(&self) -> &'static str {
        "domain-fallback"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        let Some(host) = normalize_host(line.text) else {
            return false;
        };
        if !ctx.scope.allows_domain(&host) {
            // In scope terms this line is understood and rejected.
            return true;
        }
        record_domain(ctx, &host, line.tool, line.active);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_pattern_matches_graph_lines() {
        let captures = RELATION
            .captures("www.example.com (FQDN) --> CNAME --> edge.example.com (FQDN)")
            .unwrap();
        assert_eq!(&captures["from"], "www.example.com");
        assert_eq!(&captures["rtype"], "CNAME");
        assert_eq!(&captures["to"], "edge.example.com");
    }

    #[test]
    fn relation_pattern_rejects_plain_text() {
        assert!(RELATION.captures("no relation here").is_none());
        assert!(RELATION.captures("a --> b").is_none());
    }
}

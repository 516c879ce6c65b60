//! Per-prefix parsers converting raw lines into artifact records.
//!
//! A handler returns `true` only when it intended to consume the line,
//! including the cases where it consumed and dropped it (out of scope,
//! unparseable payload for a prefix that was explicitly addressed to it).
//! Returning `false` lets the registry keep walking the fallback chain.

use async_trait::async_trait;

use perimeter_model::{Artifact, registry};

use crate::context::{Context, IncomingLine};

pub mod cert;
pub mod dns;
pub mod fallback;
pub mod gf;
pub mod meta;
pub mod rdap;
pub mod route;

pub use cert::CertHandler;
pub use dns::DnsHandler;
pub use fallback::{CertFallback, DomainFallback, MetaHeuristicFallback, RelationFallback, RouteFallback};
pub use gf::GfFindingHandler;
pub use meta::MetaHandler;
pub use rdap::RdapHandler;
pub use route::RouteHandler;

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Process one line. For prefix handlers `line.text` is the payload
    /// after the prefix; fallbacks see the whole line.
    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool;
}

/// Record a normalized, in-scope hostname as a domain artifact, writing
/// the writer slot on its first sighting in the keyspace.
pub(crate) fn record_domain(ctx: &Context, host: &str, tool: &str, active: bool) {
    let Some(entry) = registry::lookup("domain") else {
        return;
    };
    if !ctx.dedup.seen(&entry.keyspace(active), host) {
        ctx.writers.write_line(entry, host);
    }
    ctx.store
        .record(tool, Artifact::new("domain", host).with_active(active));
}

/// Cross-promote a host observed on a route or certificate: always into
/// the passive domain set, and into the active set as well when the scan
/// runs in active mode.
pub(crate) fn promote_domain(ctx: &Context, host: &str, tool: &str) {
    record_domain(ctx, host, tool, false);
    if ctx.active_mode {
        record_domain(ctx, host, tool, true);
    }
}

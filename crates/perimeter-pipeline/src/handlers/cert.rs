//! `cert:` lines: structured certificate observations.

use async_trait::async_trait;

use perimeter_model::{Artifact, CertRecord, parse_certificate_line, registry};
use perimeter_scope::normalize_host;

use crate::context::{Context, IncomingLine};
use crate::handlers::{Handler, promote_domain};

pub struct CertHandler;

#[async_trait]
impl Handler for CertHandler {
    fn name(&self) -> &'static str {
        "cert"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        match parse_certificate_line(line.text) {
            Ok(record) => {
                record_certificate(ctx, line, &record);
                true
            }
            // The line addressed this handler and failed to parse; it is
            // consumed and dropped.
            Err(_) => true,
        }
    }
}

/// Scope-filter the certificate's names uniformly, promote the survivors
/// as domains, and record the certificate keyed by its content hash.
pub(crate) fn record_certificate(ctx: &Context, line: IncomingLine<'_>, record: &CertRecord) {
    let in_scope: Vec<String> = record
        .all_names()
        .iter()
        .filter_map(|name| normalize_host(name))
        .filter(|host| ctx.scope.allows_domain(host))
        .collect();
    if in_scope.is_empty() {
        return;
    }

    for host in &in_scope {
        promote_domain(ctx, host, line.tool);
    }

    let Ok(value) = record.marshal() else {
        return;
    };
    let key = record.key();

    if let Some(entry) = registry::lookup("certificate")
        && !ctx.dedup.seen(&entry.keyspace(line.active), &key)
    {
        ctx.writers.write_line(entry, &value);
    }

    let mut artifact = Artifact::new("certificate", value).with_active(line.active);
    if let Some(source) = &record.source {
        artifact = artifact.with_meta("source", source.clone());
    }
    ctx.store.record(line.tool, artifact);
}

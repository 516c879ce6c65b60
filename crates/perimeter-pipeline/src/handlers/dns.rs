//! `dns:` lines: structured resolver output.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use perimeter_model::{Artifact, registry};

use crate::context::{Context, IncomingLine};
use crate::handlers::Handler;

#[derive(Debug, Deserialize)]
pub(crate) struct DnsPayload {
    #[serde(default)]
    pub host: String,
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub raw: Option<Value>,
    #[serde(default)]
    pub ptr: Option<String>,
}

pub struct DnsHandler;

#[async_trait]
impl Handler for DnsHandler {
    fn name(&self) -> &'static str {
        "dns"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        match serde_json::from_str::<DnsPayload>(line.text) {
            Ok(payload) => record_dns(ctx, line, &payload),
            Err(_) => {
                // Degraded record: the payload is kept verbatim so nothing
                // observed is lost.
                ctx.store.record(
                    line.tool,
                    Artifact::new("dns", line.text)
                        .with_active(line.active)
                        .with_meta("raw", line.text),
                );
            }
        }
        true
    }
}

/// Record one structured DNS observation; shared with the relation
/// fallback, which synthesizes the same payload shape.
pub(crate) fn record_dns(ctx: &Context, line: IncomingLine<'_>, payload: &DnsPayload) {
    let human = format!(
        "{} [{}] {}",
        payload.host,
        payload.record_type.to_ascii_uppercase(),
        payload.value
    );

    if let Some(entry) = registry::lookup("dns")
        && !ctx.dedup.seen(&entry.keyspace(line.active), &human)
    {
        ctx.writers.write_line(entry, line.text);
    }

    let mut artifact = Artifact::new("dns", &human)
        .with_active(line.active)
        .with_meta("host", payload.host.clone())
        .with_meta("recordType", payload.record_type.clone())
        .with_meta("recordValue", payload.value.clone());
    if let Some(raw) = &payload.raw {
        artifact = artifact.with_meta("raw", raw.clone());
    }
    if let Some(ptr) = &payload.ptr {
        artifact = artifact.with_meta("ptr", ptr.clone());
    }
    ctx.store.record(line.tool, artifact);
}

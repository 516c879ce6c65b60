//! `meta:` lines: operational messages from the tools themselves.

use async_trait::async_trait;

use perimeter_model::{Artifact, registry};

use crate::context::{Context, IncomingLine};
use crate::handlers::Handler;

pub struct MetaHandler;

#[async_trait]
impl Handler for MetaHandler {
    fn name(&self) -> &'static str {
        "meta"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        record_meta(ctx, line);
        true
    }
}

pub(crate) fn record_meta(ctx: &Context, line: IncomingLine<'_>) {
    if let Some(entry) = registry::lookup("meta") {
        ctx.writers.write_line(entry, line.text);
    }
    ctx.store.record(
        line.tool,
        Artifact::new("meta", line.text)
            .with_active(line.active)
            .with_meta("raw", line.text),
    );
}

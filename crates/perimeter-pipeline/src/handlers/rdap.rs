//! `rdap:` lines: registration-data lookups. Strictly passive.

use async_trait::async_trait;

use perimeter_model::{Artifact, registry};

use crate::context::{Context, IncomingLine};
use crate::handlers::Handler;

pub struct RdapHandler;

#[async_trait]
impl Handler for RdapHandler {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        if line.active {
            // RDAP data is registry metadata; an active flag on it is
            // meaningless and the line is dropped.
            return true;
        }

        let tool = infer_tool(line.text).unwrap_or(line.tool);

        if let Some(entry) = registry::lookup("rdap")
            && !ctx.dedup.seen(&entry.keyspace(false), line.text)
        {
            ctx.writers.write_line(entry, line.text);
        }

        ctx.store.record(
            tool,
            Artifact::new("rdap", line.text).with_meta("raw", line.text),
        );
        true
    }
}

/// The originating tool, from a leading `[tool]` tag or the first token.
fn infer_tool(text: &str) -> Option<&str> {
    if let Some(rest) = text.strip_prefix('[') {
        return rest.split(']').next().filter(|t| !t.is_empty());
    }
    text.split_whitespace().next()
}

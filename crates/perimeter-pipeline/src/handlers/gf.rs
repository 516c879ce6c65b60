//! `gffinding:` lines: pattern-match findings from gf.

use async_trait::async_trait;
use serde::Deserialize;

use perimeter_model::{Artifact, registry};

use crate::context::{Context, IncomingLine};
use crate::handlers::Handler;

#[derive(Debug, Deserialize)]
struct GfPayload {
    #[serde(default)]
    resource: String,
    #[serde(default)]
    evidence: String,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    rules: Option<Vec<String>>,
}

pub struct GfFindingHandler;

#[async_trait]
impl Handler for GfFindingHandler {
    fn name(&self) -> &'static str {
        "gffinding"
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        let Ok(payload) = serde_json::from_str::<GfPayload>(line.text) else {
            ctx.store.record(
                line.tool,
                Artifact::new("gfFinding", line.text)
                    .with_active(line.active)
                    .with_meta("raw", line.text),
            );
            return true;
        };

        let value = match payload.line {
            Some(number) => format!("{}:#{} -> {}", payload.resource, number, payload.evidence),
            None => format!("{} -> {}", payload.resource, payload.evidence),
        };

        if let Some(entry) = registry::lookup("gfFinding")
            && !ctx.dedup.seen(&entry.keyspace(line.active), &value)
        {
            ctx.writers.write_line(entry, &value);
        }

        let mut artifact = Artifact::new("gfFinding", &value)
            .with_active(line.active)
            .with_meta("resource", payload.resource)
            .with_meta("evidence", payload.evidence);
        if let Some(number) = payload.line {
            artifact = artifact.with_meta("line", number);
        }
        if let Some(context) = payload.context {
            artifact = artifact.with_meta("context", context);
        }
        if let Some(rules) = payload.rules {
            artifact = artifact.with_meta("rules", serde_json::json!(rules));
        }
        ctx.store.record(line.tool, artifact);
        true
    }
}

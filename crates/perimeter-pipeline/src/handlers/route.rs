//! The route-category handler family: `js:`, `html:`, `maps:`, `json:`,
//! `api:`, `wasm:`, `svg:`, `crawl:`, `meta-route:`, and the bare `route`
//! used by the fallback chain.

use async_trait::async_trait;
use url::Url;

use perimeter_model::{Artifact, TypeEntry, registry};
use perimeter_scope::{canonical_route_key, detect_categories, normalize_host, parse_status, route_base};

use crate::context::{Context, IncomingLine};
use crate::handlers::{Handler, promote_domain};

/// Extensions that reroute an `html:` line into the image slot.
const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".tif", ".tiff", ".jfif",
    ".avif", ".apng", ".heic", ".heif",
];

pub struct RouteHandler {
    entry: &'static TypeEntry,
}

impl RouteHandler {
    /// Build the handler for one registry entry, addressed by flat name.
    /// The name must exist in the type table.
    #[must_use]
    pub fn new(legacy: &'static str) -> Self {
        let entry = registry::lookup(legacy).expect("route handler for unregistered type");
        Self { entry }
    }
}

#[async_trait]
impl Handler for RouteHandler {
    fn name(&self) -> &'static str {
        self.entry.legacy
    }

    async fn handle(&self, ctx: &Context, line: IncomingLine<'_>) -> bool {
        handle_route(ctx, self.entry, line).await
    }
}

/// The central route path. Emits the typed artifact, fans the route out
/// into its detected categories, and cross-promotes the host and the bare
/// route.
pub(crate) async fn handle_route(
    ctx: &Context,
    entry: &'static TypeEntry,
    line: IncomingLine<'_>,
) -> bool {
    let Some((base, rest)) = route_base(line.text) else {
        return true;
    };

    // An html route pointing at an image is an image finding; it uses the
    // image keyspace and writer slot.
    let entry = if entry.legacy == "html" && is_image_url(base) {
        registry::lookup("image").unwrap_or(entry)
    } else {
        entry
    };

    if entry.check_scope && !ctx.scope.allows_route(base) {
        return true;
    }

    let status = if line.active { parse_status(rest) } else { None };
    if let Some(code) = status
        && (code <= 0 || code >= 400)
    {
        // Unreachable target: record the down artifact and stop; no
        // categorization, no cross-promotion.
        let mut artifact = base_artifact(entry, base, line).with_up(false).with_meta("status", code);
        if entry.raw_metadata && line.text != base {
            artifact = artifact.with_meta("raw", line.text);
        }
        ctx.store.record(line.tool, artifact);
        return true;
    }

    let canonical = canonical_route_key(base);
    let keyspace = entry.keyspace(line.active);

    // Active findings reserve the passive route keyspace so a later
    // passive sighting of the same base never double-emits.
    if ctx.active_mode && line.active {
        ctx.dedup.mark("route:passive", &canonical);
    }

    if !ctx.dedup.seen(&keyspace, &canonical) {
        ctx.writers.write_line(entry, line.text);
        for category in detect_categories(base) {
            if let Some(cat_entry) = registry::entry_for_category(category)
                && cat_entry.legacy != entry.legacy
            {
                Box::pin(handle_route(ctx, cat_entry, line)).await;
            }
        }
    }

    let mut artifact = base_artifact(entry, base, line);
    if entry.legacy != "route" {
        artifact = artifact.with_secondary("route");
    }
    if entry.raw_metadata && line.text != base {
        artifact = artifact.with_meta("raw", line.text);
    }
    if let Some(code) = status {
        artifact = artifact.with_meta("status", code);
    }
    ctx.store.record(line.tool, artifact);

    if let Some(host) = host_of(base)
        && ctx.scope.allows_domain(&host)
    {
        promote_domain(ctx, &host, line.tool);
    }
    if ctx.active_mode && line.active && entry.legacy != "route" {
        ctx.store
            .record(line.tool, Artifact::new("route", canonical).with_active(false));
    }

    true
}

fn base_artifact(entry: &'static TypeEntry, base: &str, line: IncomingLine<'_>) -> Artifact {
    let value = if entry.canonicalize_value {
        canonical_route_key(base)
    } else {
        base.to_string()
    };
    Artifact::new(entry.legacy, value).with_active(line.active)
}

fn is_image_url(base: &str) -> bool {
    let path = match Url::parse(base) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => base
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// The hostname a route resolves to, when it has one.
fn host_of(base: &str) -> Option<String> {
    if let Some(rest) = base.strip_prefix("//") {
        return normalize_host(rest);
    }
    if base.starts_with('/') || base.starts_with("./") || base.starts_with('#') || base.starts_with('?') {
        return None;
    }
    if base.contains("://") {
        return Url::parse(base)
            .ok()
            .and_then(|url| url.host_str().and_then(normalize_host));
    }
    // Opaque schemes (mailto:, data:) resolve to no host; a bare
    // host:port must not be mistaken for one.
    if let Some((scheme, _)) = base.split_once(':')
        && !scheme.is_empty()
        && !scheme.contains('.')
        && Url::parse(base).is_ok_and(|url| url.host_str().is_none())
    {
        return None;
    }
    normalize_host(base)
}

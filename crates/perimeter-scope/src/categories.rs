//! Route sub-classification used for fan-out routing.
//!
//! A single discovered route can be interesting to several downstream
//! consumers at once: a `.js.map` is both a route and a source map, an
//! `/api/v2/` URL is both a route and an API surface. `detect_categories`
//! is the pure function behind that fan-out.

use std::collections::BTreeSet;
use url::Url;

/// A route sub-classification. Each detected category re-emits the route
/// under the matching typed prefix.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Maps,
    Json,
    Api,
    Wasm,
    Svg,
    Crawl,
    Meta,
}

const META_FILES: &[&str] = &["robots.txt", "sitemap.xml", "humans.txt", "security.txt"];
const CRAWL_EXTENSIONS: &[&str] = &[".php", ".asp", ".aspx", ".jsp"];

/// Classify a route into zero or more categories.
///
/// Works on the URL path and query when the route parses as an absolute
/// URL, and on the raw text otherwise, so relative routes classify the
/// same way as absolute ones.
pub fn detect_categories(route: &str) -> BTreeSet<Category> {
    let (path, has_query) = match Url::parse(route) {
        Ok(url) => (url.path().to_ascii_lowercase(), url.query().is_some_and(|q| !q.is_empty())),
        Err(_) => {
            let base = route.split(['#']).next().unwrap_or_default();
            match base.split_once('?') {
                Some((p, q)) => (p.to_ascii_lowercase(), !q.is_empty()),
                None => (base.to_ascii_lowercase(), false),
            }
        }
    };

    let mut found = BTreeSet::new();

    if path.ends_with(".map") {
        found.insert(Category::Maps);
    }
    if path.ends_with(".json") || path.ends_with(".jsonl") {
        found.insert(Category::Json);
    }
    if path.ends_with(".wasm") {
        found.insert(Category::Wasm);
    }
    if path.ends_with(".svg") {
        found.insert(Category::Svg);
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .iter()
        .any(|s| matches!(*s, "api" | "graphql" | "rest") || is_version_segment(s))
    {
        found.insert(Category::Api);
    }
    if segments.iter().any(|s| *s == ".well-known")
        || segments.last().is_some_and(|last| META_FILES.contains(last))
    {
        found.insert(Category::Meta);
    }
    if has_query || CRAWL_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        found.insert(Category::Crawl);
    }

    found
}

/// `v1`, `v2`, ... segments mark versioned API surfaces.
fn is_version_segment(s: &str) -> bool {
    match s.strip_prefix('v') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

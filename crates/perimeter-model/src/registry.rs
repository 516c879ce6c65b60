//! The central table of artifact types.
//!
//! Every type the pipeline can emit has one entry describing its dedup
//! keyspace, its raw-line writer slot, whether handlers must scope-check
//! it, and how its value is stored. The flat "legacy" names (`js`,
//! `html`, `maps`, ...) are what handlers and the v1 model speak; the
//! structured (type, subtype) pairs behind them drive shard hashing and
//! let older inputs map onto the same table.

use perimeter_scope::Category;

/// One row of the type table.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry {
    /// Structured primary type (`route`, `domain`, `certificate`, ...).
    pub ty: &'static str,
    /// Structured subtype; empty when the type has none.
    pub subtype: &'static str,
    /// Flat v1 name used by handlers and the in-memory model.
    pub legacy: &'static str,
    /// Dedup keyspace prefix; `:passive` / `:active` is appended.
    pub keyspace: &'static str,
    /// Writer slot directory, relative to the output root.
    pub output_dir: &'static str,
    /// Writer slot file name.
    pub output_file: &'static str,
    /// The route category this entry is the target of, if any.
    pub category: Option<Category>,
    /// Whether handlers must pass the value through the scope filter.
    pub check_scope: bool,
    /// Whether the raw input line is kept in `metadata.raw`.
    pub raw_metadata: bool,
    /// Whether the stored value is the canonical route key rather than
    /// the literal token from the line.
    pub canonicalize_value: bool,
}

pub const TABLE: &[TypeEntry] = &[
    TypeEntry {
        ty: "domain",
        subtype: "",
        legacy: "domain",
        keyspace: "domain",
        output_dir: "",
        output_file: "domains.txt",
        category: None,
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "route",
        subtype: "",
        legacy: "route",
        keyspace: "route",
        output_dir: "routes",
        output_file: "routes.txt",
        category: None,
        check_scope: true,
        raw_metadata: true,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "js",
        legacy: "js",
        keyspace: "route:js",
        output_dir: "routes",
        output_file: "js.txt",
        category: None,
        check_scope: true,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "route",
        subtype: "html",
        legacy: "html",
        keyspace: "html",
        output_dir: "routes",
        output_file: "html.txt",
        category: None,
        check_scope: true,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "route",
        subtype: "image",
        legacy: "image",
        keyspace: "image",
        output_dir: "routes",
        output_file: "images.txt",
        category: None,
        check_scope: true,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "route",
        subtype: "maps",
        legacy: "maps",
        keyspace: "route:maps",
        output_dir: "routes",
        output_file: "maps.txt",
        category: Some(Category::Maps),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "json",
        legacy: "json",
        keyspace: "route:json",
        output_dir: "routes",
        output_file: "json.txt",
        category: Some(Category::Json),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "api",
        legacy: "api",
        keyspace: "route:api",
        output_dir: "routes",
        output_file: "api.txt",
        category: Some(Category::Api),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "wasm",
        legacy: "wasm",
        keyspace: "route:wasm",
        output_dir: "routes",
        output_file: "wasm.txt",
        category: Some(Category::Wasm),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "svg",
        legacy: "svg",
        keyspace: "route:svg",
        output_dir: "routes",
        output_file: "svg.txt",
        category: Some(Category::Svg),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "crawl",
        legacy: "crawl",
        keyspace: "route:crawl",
        output_dir: "routes",
        output_file: "crawl.txt",
        category: Some(Category::Crawl),
        check_scope: true,
        raw_metadata: false,
        canonicalize_value: true,
    },
    TypeEntry {
        ty: "route",
        subtype: "meta",
        legacy: "meta-route",
        keyspace: "route:meta",
        output_dir: "routes",
        output_file: "meta.txt",
        category: Some(Category::Meta),
        check_scope: true,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "certificate",
        subtype: "",
        legacy: "certificate",
        keyspace: "cert",
        output_dir: "certs",
        output_file: "certificates.txt",
        category: None,
        check_scope: false,
        raw_metadata: false,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "dns",
        subtype: "",
        legacy: "dns",
        keyspace: "dns",
        output_dir: "dns",
        output_file: "records.txt",
        category: None,
        check_scope: false,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "rdap",
        subtype: "",
        legacy: "rdap",
        keyspace: "rdap",
        output_dir: "",
        output_file: "rdap.txt",
        category: None,
        check_scope: false,
        raw_metadata: true,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "gfFinding",
        subtype: "",
        legacy: "gfFinding",
        keyspace: "gf",
        output_dir: "findings",
        output_file: "gf.txt",
        category: None,
        check_scope: false,
        raw_metadata: false,
        canonicalize_value: false,
    },
    TypeEntry {
        ty: "meta",
        subtype: "",
        legacy: "meta",
        keyspace: "meta",
        output_dir: "",
        output_file: "meta.txt",
        category: None,
        check_scope: false,
        raw_metadata: true,
        canonicalize_value: false,
    },
];

/// Look an entry up by its flat name (`js`) or structured spelling
/// (`route.js`).
#[must_use]
pub fn lookup(name: &str) -> Option<&'static TypeEntry> {
    if let Some((ty, subtype)) = name.split_once('.') {
        return by_parts(ty, subtype);
    }
    TABLE.iter().find(|e| e.legacy == name)
}

/// Look an entry up by its structured (type, subtype) pair.
#[must_use]
pub fn by_parts(ty: &str, subtype: &str) -> Option<&'static TypeEntry> {
    TABLE.iter().find(|e| e.ty == ty && e.subtype == subtype)
}

/// The entry a route category fans out into.
#[must_use]
pub fn entry_for_category(category: Category) -> Option<&'static TypeEntry> {
    TABLE.iter().find(|e| e.category == Some(category))
}

/// Resolve a flat name into its structured (type, subtype) pair. Unknown
/// names map to themselves with an empty subtype.
#[must_use]
pub fn split_legacy(legacy: &str) -> (&str, &str) {
    match TABLE.iter().find(|e| e.legacy == legacy) {
        Some(entry) => (entry.ty, entry.subtype),
        None => (legacy, ""),
    }
}

/// The flat name for a structured pair, when the table knows it.
#[must_use]
pub fn legacy_name(ty: &str, subtype: &str) -> Option<&'static str> {
    by_parts(ty, subtype).map(|e| e.legacy)
}

/// The dedup keyspace for a type at a given probe mode, e.g.
/// `route:json:active`.
#[must_use]
pub fn keyspace_for(ty: &str, subtype: &str, active: bool) -> Option<String> {
    by_parts(ty, subtype).map(|e| format!("{}:{}", e.keyspace, mode_suffix(active)))
}

/// `active` / `passive`, the trailing component of every keyspace.
#[must_use]
pub const fn mode_suffix(active: bool) -> &'static str {
    if active { "active" } else { "passive" }
}

impl TypeEntry {
    /// This entry's dedup keyspace at a given probe mode.
    #[must_use]
    pub fn keyspace(&self, active: bool) -> String {
        format!("{}:{}", self.keyspace, mode_suffix(active))
    }
}

//! Dedup identity and shard placement for artifacts.

use perimeter_scope::canonical_route_key;

use crate::artifact::Artifact;
use crate::registry;

/// Types that collapse into the `route` key category. A URL discovered as
/// `js` and later as `html` is still the same route.
const ROUTE_LIKE: &[&str] = &[
    "route",
    "html",
    "js",
    "image",
    "maps",
    "json",
    "api",
    "wasm",
    "svg",
    "crawl",
    "meta-route",
];

/// Collapse an artifact type into its key category.
#[must_use]
pub fn category_of(artifact_type: &str) -> &str {
    if artifact_type.is_empty() {
        "?"
    } else if ROUTE_LIKE.contains(&artifact_type) {
        "route"
    } else {
        artifact_type
    }
}

/// The dedup identity of an artifact: `(category, canonical value,
/// active)`. Exactly one in-memory record exists per key for the life of
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub category: String,
    pub value: String,
    pub active: bool,
}

impl ArtifactKey {
    /// Compute the key for an artifact. Route-category values are
    /// canonicalized so that URL spelling variants collide.
    #[must_use]
    pub fn of(artifact: &Artifact) -> Self {
        let category = category_of(&artifact.artifact_type).to_string();
        let value = if category == "route" {
            canonical_route_key(&artifact.value)
        } else {
            artifact.value.clone()
        };
        Self {
            category,
            value,
            active: artifact.active,
        }
    }

    /// Shard placement: FNV-32a over `type|subtype|value|active`, with the
    /// (type, subtype) pair resolved through the registry's legacy
    /// bijection so flat and structured spellings land together.
    #[must_use]
    pub fn shard(&self, primary_type: &str, shard_count: usize) -> usize {
        let (ty, subtype) = registry::split_legacy(primary_type);
        let material = format!("{ty}|{subtype}|{}|{}", self.value, self.active);
        fnv32a(material.as_bytes()) as usize % shard_count.max(1)
    }
}

/// FNV-1a, 32-bit.
#[must_use]
pub fn fnv32a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    bytes.iter().fold(OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fnv32a_known_vectors() {
        // Reference vectors from the FNV specification.
        assert_eq!(fnv32a(b""), 0x811c_9dc5);
        assert_eq!(fnv32a(b"a"), 0xe40c_292c);
        assert_eq!(fnv32a(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn route_like_types_collapse() {
        for ty in ["route", "html", "js", "image", "maps", "json", "api", "wasm", "svg", "crawl", "meta-route"] {
            assert_eq!(category_of(ty), "route");
        }
        assert_eq!(category_of("domain"), "domain");
        assert_eq!(category_of("certificate"), "certificate");
        assert_eq!(category_of(""), "?");
    }

    #[test]
    fn key_distinguishes_active_from_passive() {
        let passive = Artifact::new("domain", "example.com");
        let active = Artifact::new("domain", "example.com").with_active(true);
        assert_ne!(ArtifactKey::of(&passive), ArtifactKey::of(&active));
    }

    #[test]
    fn route_spelling_variants_collide() {
        let a = Artifact::new("js", "HTTPS://App.Example.com:443/app.js");
        let b = Artifact::new("html", "https://app.example.com/app.js");
        assert_eq!(ArtifactKey::of(&a), ArtifactKey::of(&b));
    }

    #[test]
    fn shard_is_stable_and_bounded() {
        let artifact = Artifact::new("js", "https://app.example.com/app.js");
        let key = ArtifactKey::of(&artifact);
        let shard = key.shard(&artifact.artifact_type, 16);
        assert!(shard < 16);
        assert_eq!(key.shard(&artifact.artifact_type, 16), shard);
    }

    proptest! {
        #[test]
        fn shard_never_exceeds_count(value in "\\PC{0,64}", count in 1usize..64) {
            let artifact = Artifact::new("domain", value);
            let key = ArtifactKey::of(&artifact);
            prop_assert!(key.shard(&artifact.artifact_type, count) < count);
        }
    }
}

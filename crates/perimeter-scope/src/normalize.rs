//! Canonicalization of hostnames, route bases, and probe statuses.
//!
//! Tool output is messy: hosts arrive with comments, credentials, ports,
//! brackets, and trailing dots; routes arrive with status columns and
//! titles appended. These functions reduce that free text to the canonical
//! forms the dedup keyspaces and the artifact store key on.

use std::net::IpAddr;
use url::Url;

/// Normalize a free-text hostname candidate.
///
/// Strips `#` comments, takes the first whitespace token, drops
/// credentials, path, query, fragment, port, IPv6 brackets, and trailing
/// dots, then lowercases. Returns `None` for wildcards and for
/// single-label names that are not IP literals.
pub fn normalize_host(raw: &str) -> Option<String> {
    let s = raw.split('#').next().unwrap_or_default();
    let s = s.split_whitespace().next()?;
    let s = match s.rsplit_once('@') {
        Some((_, host)) => host,
        None => s,
    };
    let s = s.split(['/', '?']).next()?;
    let s = strip_port(s);
    let s = s.trim_end_matches('.').to_ascii_lowercase();

    if s.is_empty() || s.contains('*') {
        return None;
    }
    if s.parse::<IpAddr>().is_ok() {
        return Some(s);
    }
    if !s.contains('.') {
        return None;
    }
    Some(s)
}

/// Remove a trailing `:port` and IPv6 brackets from a host token.
///
/// Bracketless IPv6 literals (more than one colon) are left intact.
fn strip_port(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix('[') {
        // "[::1]:8080" or "[::1]"
        return rest.split(']').next().unwrap_or(rest);
    }
    match s.rsplit_once(':') {
        Some((host, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && !host.contains(':') =>
        {
            host
        }
        _ => s,
    }
}

/// Split a route line into its base URL (first whitespace token) and the
/// remainder, which may carry a probe status and annotations.
pub fn route_base(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((base, rest)) => Some((base, rest)),
        None => Some((trimmed, "")),
    }
}

/// Canonical dedup key for a route.
///
/// Absolute URLs are reparsed so that scheme and host are lowercased,
/// default ports are dropped, and empty paths become `/`, while userinfo,
/// query, and fragment survive untouched. Anything that does not parse as
/// an absolute URL (relative paths, bare fragments) is returned verbatim,
/// which keeps the function idempotent in every case.
pub fn canonical_route_key(route: &str) -> String {
    match Url::parse(route) {
        Ok(url) => url.to_string(),
        Err(_) => route.to_string(),
    }
}

/// Extract a probe status from the remainder of a route line.
///
/// Recognizes a leading `[NNN]` immediately after the base; anything else
/// yields `None`.
pub fn parse_status(rest: &str) -> Option<i32> {
    let rest = rest.trim_start().strip_prefix('[')?;
    let digits = rest.split(']').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn host_basic_lowercase() {
        assert_eq!(normalize_host("WWW.Example.COM"), Some("www.example.com".into()));
    }

    #[test]
    fn host_strips_comment_and_whitespace() {
        assert_eq!(normalize_host("example.com # seen in crt.sh"), Some("example.com".into()));
        assert_eq!(normalize_host("  example.com other.com"), Some("example.com".into()));
    }

    #[test]
    fn host_strips_credentials_port_path() {
        assert_eq!(normalize_host("user@example.com"), Some("example.com".into()));
        assert_eq!(normalize_host("user:pw@example.com:8443/admin?x=1"), Some("example.com".into()));
    }

    #[test]
    fn host_strips_brackets_and_trailing_dot() {
        assert_eq!(normalize_host("[2001:db8::1]:443"), Some("2001:db8::1".into()));
        assert_eq!(normalize_host("example.com."), Some("example.com".into()));
    }

    #[test]
    fn host_accepts_ip_literals() {
        assert_eq!(normalize_host("192.168.1.10"), Some("192.168.1.10".into()));
        assert_eq!(normalize_host("2001:db8::1"), Some("2001:db8::1".into()));
    }

    #[test]
    fn host_rejects_wildcards_and_single_labels() {
        assert_eq!(normalize_host("*.example.com"), None);
        assert_eq!(normalize_host("localhost"), None);
        assert_eq!(normalize_host(""), None);
        assert_eq!(normalize_host("   "), None);
    }

    #[test]
    fn route_base_splits_on_first_whitespace() {
        assert_eq!(
            route_base("https://a.example.com/x [200] [Title]"),
            Some(("https://a.example.com/x", "[200] [Title]"))
        );
        assert_eq!(route_base("https://a.example.com/x"), Some(("https://a.example.com/x", "")));
        assert_eq!(route_base("   "), None);
    }

    #[test]
    fn canonical_key_normalizes_absolute_urls() {
        assert_eq!(
            canonical_route_key("HTTPS://App.Example.COM:443"),
            "https://app.example.com/"
        );
        assert_eq!(
            canonical_route_key("http://example.com:80/a?b=1#frag"),
            "http://example.com/a?b=1#frag"
        );
        assert_eq!(
            canonical_route_key("https://user:pw@example.com/x"),
            "https://user:pw@example.com/x"
        );
    }

    #[test]
    fn canonical_key_passes_relative_routes_through() {
        assert_eq!(canonical_route_key("/admin"), "/admin");
        assert_eq!(canonical_route_key("./x"), "./x");
    }

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("[200] [Title]"), Some(200));
        assert_eq!(parse_status(" [0]"), Some(0));
        assert_eq!(parse_status("[503]"), Some(503));
        assert_eq!(parse_status("[20x]"), None);
        assert_eq!(parse_status("[Title]"), None);
        assert_eq!(parse_status(""), None);
        assert_eq!(parse_status("200"), None);
    }

    proptest! {
        #[test]
        fn canonical_key_is_idempotent(route in "\\PC{0,80}") {
            let once = canonical_route_key(&route);
            prop_assert_eq!(canonical_route_key(&once), once.clone());
        }

        #[test]
        fn normalized_hosts_are_stable(host in "[a-zA-Z0-9.-]{1,40}") {
            if let Some(normalized) = normalize_host(&host) {
                prop_assert_eq!(normalize_host(&normalized), Some(normalized.clone()));
            }
        }
    }
}

//! Target scope: does a host or route belong to the perimeter under scan?

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

use crate::normalize::normalize_host;

/// How far beyond the exact target the scope extends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeMode {
    /// Only the target host itself.
    Domain,
    /// The target host and any subdomain of it.
    #[default]
    Subdomains,
}

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("invalid scope target: {target:?}")]
    InvalidTarget { target: String },
}

/// The target-rooted predicate deciding whether a host or URL belongs to
/// the scan. Immutable after construction; shared freely across workers.
#[derive(Debug, Clone)]
pub struct Scope {
    target: String,
    target_is_ip: bool,
    mode: ScopeMode,
}

impl Scope {
    /// Build a scope from a raw target string. The target goes through the
    /// same hostname normalization as every candidate.
    pub fn new(target: &str, mode: ScopeMode) -> Result<Self, ScopeError> {
        let normalized = normalize_host(target).ok_or_else(|| ScopeError::InvalidTarget {
            target: target.to_string(),
        })?;
        let target_is_ip = normalized.parse::<IpAddr>().is_ok();
        Ok(Self {
            target: normalized,
            target_is_ip,
            mode,
        })
    }

    /// The normalized target this scope is rooted at.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// Whether a hostname candidate is in scope.
    pub fn allows_domain(&self, candidate: &str) -> bool {
        let Some(host) = normalize_host(candidate) else {
            return false;
        };
        let host_is_ip = host.parse::<IpAddr>().is_ok();

        if self.target_is_ip {
            return host == self.target;
        }
        if host_is_ip {
            return false;
        }
        if host == self.target {
            return true;
        }
        match self.mode {
            ScopeMode::Domain => false,
            ScopeMode::Subdomains => {
                host.len() > self.target.len() + 1
                    && host.ends_with(&self.target)
                    && host.as_bytes()[host.len() - self.target.len() - 1] == b'.'
            }
        }
    }

    /// Whether a route is in scope.
    ///
    /// Relative paths and host-less URLs (`mailto:`, `data:`) cannot escape
    /// the perimeter and are always allowed; everything that resolves to a
    /// hostname defers to [`Self::allows_domain`].
    pub fn allows_route(&self, route: &str) -> bool {
        let route = route.trim();
        if route.is_empty() {
            return false;
        }

        if let Some(rest) = route.strip_prefix("//") {
            // Scheme-relative: //host/path
            return self.allows_domain(rest);
        }
        if route.starts_with('/')
            || route.starts_with("./")
            || route.starts_with('#')
            || route.starts_with('?')
        {
            return true;
        }
        if route.contains("://") {
            return match Url::parse(route) {
                Ok(url) => match url.host_str() {
                    Some(host) => self.allows_domain(host),
                    None => true,
                },
                Err(_) => false,
            };
        }
        // Opaque schemes such as mailto: and data: carry no host. A bare
        // host:port also parses as scheme-plus-opaque-path, so only treat
        // the route as a URL when the scheme part cannot be a hostname.
        if let Some((scheme, _)) = route.split_once(':')
            && !scheme.is_empty()
            && !scheme.contains('.')
            && Url::parse(route).is_ok_and(|url| url.host_str().is_none())
        {
            return true;
        }
        // Bare hostname, possibly with a port or path.
        self.allows_domain(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subdomains(target: &str) -> Scope {
        Scope::new(target, ScopeMode::Subdomains).unwrap()
    }

    fn exact(target: &str) -> Scope {
        Scope::new(target, ScopeMode::Domain).unwrap()
    }

    #[test]
    fn target_is_normalized() {
        let scope = subdomains("EXAMPLE.com.");
        assert_eq!(scope.target(), "example.com");
    }

    #[test]
    fn invalid_targets_are_rejected() {
        assert!(Scope::new("*", ScopeMode::Subdomains).is_err());
        assert!(Scope::new("", ScopeMode::Subdomains).is_err());
        assert!(Scope::new("localhost", ScopeMode::Subdomains).is_err());
    }

    #[test]
    fn exact_match_always_allowed() {
        assert!(subdomains("example.com").allows_domain("example.com"));
        assert!(exact("example.com").allows_domain("Example.COM"));
    }

    #[test]
    fn subdomain_mode_accepts_children_only() {
        let scope = subdomains("example.com");
        assert!(scope.allows_domain("app.example.com"));
        assert!(scope.allows_domain("deep.nested.example.com"));
        assert!(!scope.allows_domain("notexample.com"));
        assert!(!scope.allows_domain("example.com.evil.net"));
    }

    #[test]
    fn domain_mode_rejects_children() {
        let scope = exact("example.com");
        assert!(!scope.allows_domain("app.example.com"));
    }

    #[test]
    fn ip_scope_accepts_identical_ip_only() {
        let scope = subdomains("192.168.1.10");
        assert!(scope.allows_domain("192.168.1.10"));
        assert!(!scope.allows_domain("192.168.1.11"));
        assert!(!scope.allows_domain("example.com"));
    }

    #[test]
    fn domain_scope_rejects_ips() {
        assert!(!subdomains("example.com").allows_domain("192.168.1.10"));
    }

    #[test]
    fn wildcards_and_single_labels_rejected() {
        let scope = subdomains("example.com");
        assert!(!scope.allows_domain("*.example.com"));
        assert!(!scope.allows_domain("intranet"));
    }

    #[test]
    fn relative_routes_are_allowed() {
        let scope = exact("example.com");
        for route in ["/admin", "./static/app.js", "#section", "?page=2"] {
            assert!(scope.allows_route(route), "expected {route:?} in scope");
        }
    }

    #[test]
    fn absolute_routes_defer_to_domain() {
        let scope = subdomains("example.com");
        assert!(scope.allows_route("https://app.example.com/login"));
        assert!(!scope.allows_route("https://other.net/login"));
    }

    #[test]
    fn scheme_relative_routes_resolve_host() {
        let scope = subdomains("example.com");
        assert!(scope.allows_route("//cdn.example.com/app.js"));
        assert!(!scope.allows_route("//cdn.other.net/app.js"));
    }

    #[test]
    fn bare_hosts_resolve() {
        let scope = subdomains("example.com");
        assert!(scope.allows_route("app.example.com"));
        assert!(scope.allows_route("app.example.com/path"));
        assert!(!scope.allows_route("other.net"));
    }

    #[test]
    fn bare_host_with_port_is_not_mistaken_for_a_scheme() {
        let scope = subdomains("example.com");
        assert!(scope.allows_route("app.example.com:8443/x"));
        assert!(!scope.allows_route("other.net:8443"));
    }

    #[test]
    fn hostless_urls_cannot_escape_scope() {
        let scope = exact("example.com");
        assert!(scope.allows_route("mailto:security@other.net"));
        assert!(scope.allows_route("data:text/plain;base64,aGk="));
    }

    #[test]
    fn domain_mode_route_rejection() {
        // Target example.com in exact mode: a subdomain route is out.
        let scope = exact("example.com");
        assert!(!scope.allows_route("https://sub.example.com/"));
    }
}

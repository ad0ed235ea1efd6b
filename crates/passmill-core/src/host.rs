//! Host canonicalization for web-mode site URIs
//!
//! A site is entered free-form (`https://www.example.com/login`,
//! `example.com`, `//10.0.0.1:8443/`), so the host is pulled out of whatever
//! URI shape the user typed and then checked against one of two patterns:
//!
//! - a DNS name with a public-suffix-like tail (`example.com`, `sub.example.co.uk`)
//! - a dotted-quad IPv4 address with every octet in `0..=255`
//!
//! Anything else, including an empty host, is no host at all. No name
//! resolution happens here. Matching is case-sensitive; the request layer
//! lowercases the URI before it gets here.

use regex::Regex;
use std::sync::OnceLock;

/// First label of 2-63 alphanumerics/hyphens not starting or ending with a
/// hyphen, then one or more purely alphabetic labels of 2+ characters.
const DOMAIN_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9](?:\.[a-zA-Z]{2,})+$";

const IPV4_PATTERN: &str = r"^(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DOMAIN_PATTERN).expect("hardcoded domain pattern compiles"))
}

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IPV4_PATTERN).expect("hardcoded IPv4 pattern compiles"))
}

/// Extract the raw host component of a URI without validating it.
///
/// Parsing is deliberately loose: the scheme and the `//` marker are both
/// optional, so `example.com/path` yields `example.com`. User info
/// (`user:pass@`) and a trailing `:port` are stripped. Returns `None` when
/// the host component is empty.
pub fn parse_uri_host(uri: &str) -> Option<&str> {
    let rest = strip_scheme(uri);

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    let host_port = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    let host = match host_port.find(':') {
        Some(colon) => &host_port[..colon],
        None => host_port,
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Drop a leading `scheme://` or bare `//`.
///
/// A scheme only counts when it is followed by `//`, so `example.com:8080`
/// keeps its host and `mailto:bob@example.com` falls through to the
/// user-info stripping in [`parse_uri_host`].
fn strip_scheme(uri: &str) -> &str {
    if let Some(tail) = uri.strip_prefix("//") {
        return tail;
    }
    if let Some((scheme, tail)) = uri.split_once(':') {
        let is_scheme = !scheme.is_empty()
            && !scheme.contains(['/', '?', '#', '.', '@'])
            && !scheme.contains(char::is_whitespace);
        if is_scheme {
            if let Some(after) = tail.strip_prefix("//") {
                return after;
            }
        }
    }
    uri
}

/// Whether `host` is an acceptable DNS name.
pub fn is_valid_domain(host: &str) -> bool {
    domain_regex().is_match(host)
}

/// Whether `host` is a dotted-quad IPv4 address.
pub fn is_valid_ipv4(host: &str) -> bool {
    ipv4_regex().is_match(host)
}

/// Extract and validate the host of a site URI.
///
/// # Example
/// ```
/// use passmill_core::host::host_of;
/// assert_eq!(host_of("http://www.example.com/foo/index.html").as_deref(), Some("www.example.com"));
/// assert_eq!(host_of("http://127.0.0.1/foo").as_deref(), Some("127.0.0.1"));
/// assert_eq!(host_of("http://999.999.1.1/x"), None);
/// ```
pub fn host_of(uri: &str) -> Option<String> {
    let host = parse_uri_host(uri)?;
    if is_valid_domain(host) || is_valid_ipv4(host) {
        Some(host.to_string())
    } else {
        None
    }
}

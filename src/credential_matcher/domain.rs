//! Site identity canonicalization.
//!
//! Reduces a raw site string (full URL, bare host, or whatever the host app
//! reports as its web domain) to a base domain used to scope credential
//! matching.
//!
//! This is an approximation, NOT a public suffix list lookup. The short-suffix
//! rule keeps three labels when both trailing labels are at most three
//! characters long, which covers the common `co.uk` / `com.au` shapes but will
//! mis-handle e.g. `sub.example.io.ai` or `a.b.gov`. Such false positives and
//! negatives are accepted.

use url::{Host, ParseError, Url};

/// Labels of this length or shorter count as "short" for the compound suffix rule.
const SHORT_LABEL_MAX: usize = 3;

/// Canonicalize a raw site identity to its base domain.
///
/// * `None` or empty input returns `None`.
/// * A bare host (`www.example.co.uk`, `example.com:8080`) is read as if it
///   had an `https://` scheme, so it gets the same trimming as a full URL.
/// * Parseable URI without a host returns the raw input unchanged.
/// * Anything else unparseable falls back to the last two dot-separated labels.
///
/// # Examples
/// ```
/// use openpass_core::canonicalize;
/// assert_eq!(canonicalize(Some("https://www.example.co.uk/login")).as_deref(), Some("example.co.uk"));
/// assert_eq!(canonicalize(Some("https://accounts.google.com")).as_deref(), Some("google.com"));
/// assert_eq!(canonicalize(None), None);
/// ```
pub fn canonicalize(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    let parsed = match Url::parse(raw) {
        // "example.com:8080" parses with "example.com" as its scheme.
        Ok(url) if url.scheme().contains('.') => parse_bare_host(raw),
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => parse_bare_host(raw),
        Err(e) => Err(e),
    };
    let url = match parsed {
        Ok(url) => url,
        Err(_) => return Some(fallback_last_two_labels(raw)),
    };

    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        // IP literals have no registrable part to trim.
        Some(Host::Ipv4(addr)) => return Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => return Some(addr.to_string()),
        None => return Some(raw.to_string()),
    };

    Some(base_domain(&host))
}

fn parse_bare_host(raw: &str) -> Result<Url, ParseError> {
    Url::parse(&format!("https://{}", raw))
}

/// Apply `www.` stripping and the short-suffix heuristic to a bare host.
pub fn base_domain(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();

    if labels.len() <= 2 {
        return host.to_string();
    }

    let last = labels[labels.len() - 1];
    let second_last = labels[labels.len() - 2];
    let keep = if second_last.len() <= SHORT_LABEL_MAX && last.len() <= SHORT_LABEL_MAX {
        3
    } else {
        2
    };

    labels[labels.len() - keep..].join(".")
}

/// Naive dot-splitting for input that is neither a URI nor a host.
fn fallback_last_two_labels(raw: &str) -> String {
    let labels: Vec<&str> = raw.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        raw.to_string()
    }
}

//! Feed URL safety checks.
//!
//! Feeds are fetched from the server's own network, so a user-supplied URL
//! must never point back into it. Validation is purely syntactic: no DNS
//! lookups, no requests.

use std::net::Ipv4Addr;

use url::{Host, Url};

use crate::error::ValidationError;

const ALLOWED_SCHEMES: &[&str] = &["https", "webcal"];
const BLOCKED_HOST_PREFIXES: &[&str] = &["127.", "192.168.", "10."];

/// Check a candidate feed URL, returning it normalized if it is acceptable.
///
/// Host checks run against [`fetch_url`], the URL that will be requested:
/// `webcal` hosts are not normalized by the parser, so `webcal://2130706433/`
/// only shows up as `127.0.0.1` after the rewrite.
pub fn validate_source_url(candidate: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(candidate.trim())
        .map_err(|_| ValidationError::InvalidUrl(candidate.to_string()))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::DisallowedScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::InvalidUrl(candidate.to_string()));
    }

    let target =
        try_fetch_url(&url).ok_or_else(|| ValidationError::InvalidUrl(candidate.to_string()))?;
    check_public_host(&target)?;

    Ok(url)
}

/// Reject URLs whose host is loopback or on a private network.
pub fn check_public_host(url: &Url) -> Result<(), ValidationError> {
    let blocked = match url.host() {
        None => return Err(ValidationError::InvalidUrl(url.to_string())),
        Some(Host::Ipv4(ip)) => is_private_ipv4(ip),
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(is_private_ipv4),
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost"
                || domain.ends_with(".localhost")
                || BLOCKED_HOST_PREFIXES.iter().any(|p| domain.starts_with(p))
        }
    };

    if blocked {
        let host = url.host_str().unwrap_or_default().to_string();
        return Err(ValidationError::PrivateNetworkBlocked(host));
    }
    Ok(())
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    matches!(ip.octets(), [127, ..] | [10, ..] | [192, 168, ..])
}

/// The URL to actually request. `webcal://` is a subscription alias for https.
pub fn fetch_url(url: &Url) -> Url {
    try_fetch_url(url).unwrap_or_else(|| url.clone())
}

fn try_fetch_url(url: &Url) -> Option<Url> {
    if url.scheme() != "webcal" {
        return Some(url.clone());
    }

    let rewritten = format!("https{}", &url.as_str()["webcal".len()..]);
    Url::parse(&rewritten).ok()
}

//! URL admission and manifest classification.
//!
//! Every analysis starts here: the submitted reference must parse as an
//! absolute http(s) URL, must not point at loopback or private address
//! space, and must carry a recognised manifest suffix before anything
//! is fetched.

use std::net::IpAddr;

use url::{Host, Url};

use crate::errors::{AnalysisError, AppResult};
use crate::models::ManifestKind;

/// Validate a submitted manifest reference and classify its format.
///
/// Classification looks at the URL path only, so query parameters that
/// happen to contain URLs or other suffixes do not affect the result.
pub fn classify_manifest_url(raw: &str) -> AppResult<(Url, ManifestKind)> {
    let url = Url::parse(raw)
        .map_err(|e| AnalysisError::invalid_reference(format!("not a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AnalysisError::invalid_reference(format!(
                "unsupported scheme '{other}', only http and https are allowed"
            )));
        }
    }

    let host = url
        .host()
        .ok_or_else(|| AnalysisError::invalid_reference("URL has no host".to_string()))?;
    if is_blocked_host(&host) {
        return Err(AnalysisError::invalid_reference(format!(
            "host '{host}' resolves to a private or loopback address"
        )));
    }

    let kind = classify_path(url.path()).ok_or_else(|| {
        AnalysisError::invalid_reference(
            "URL path does not end in a supported manifest suffix (.m3u8 or .mpd)".to_string(),
        )
    })?;

    Ok((url, kind))
}

fn classify_path(path: &str) -> Option<ManifestKind> {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".m3u8") {
        Some(ManifestKind::Hls)
    } else if lower.ends_with(".mpd") {
        Some(ManifestKind::Dash)
    } else {
        None
    }
}

/// Hosts that must never be fetched: loopback, RFC 1918 ranges,
/// link-local addresses, the unspecified address, and the literal
/// `localhost` name. Hostnames are not resolved here; a name that
/// maps to a private address is caught by operators at the network
/// layer, not by this gate.
fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(addr) => is_blocked_ip(&IpAddr::V4(*addr)),
        Host::Ipv6(addr) => is_blocked_ip(&IpAddr::V6(*addr)),
        Host::Domain(name) => name.eq_ignore_ascii_case("localhost"),
    }
}

fn is_blocked_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return true;
            }
            // IPv4-mapped addresses get the IPv4 rules
            match v6.to_ipv4_mapped() {
                Some(mapped) => is_blocked_ip(&IpAddr::V4(mapped)),
                None => false,
            }
        }
    }
}

/// Resolve a possibly-relative reference found inside a manifest
/// against the manifest's own URL.
pub fn resolve_reference(base: &Url, reference: &str) -> AppResult<Url> {
    base.join(reference)
        .map_err(|e| AnalysisError::invalid_reference(format!("bad reference '{reference}': {e}")))
}

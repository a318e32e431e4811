//! Input validation
//!
//! - `validate_url` keeps the scraper away from non-web schemes and private networks
//! - `integrity_check` stops placeholder text from being archived or emailed

use crate::error::UrlRejection;
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Longest URL accepted for scraping
pub const MAX_URL_LEN: usize = 2048;

/// Minimum length of deliverable content
pub const MIN_CONTENT_LEN: usize = 50;

/// Returned when content is rejected and nothing was gathered
pub const MISSION_FAILED_FALLBACK: &str = "Mission failed: No meaningful data gathered.";

const FORBIDDEN_MARKERS: [&str; 4] = ["placeholder", "insert here", "no data found", "error"];

/// Validate a URL for scraping
pub fn validate_url(raw: &str) -> Result<Url, UrlRejection> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlRejection::Empty);
    }
    if raw.len() > MAX_URL_LEN {
        return Err(UrlRejection::TooLong(MAX_URL_LEN));
    }

    let url = Url::parse(raw).map_err(|e| UrlRejection::Malformed(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlRejection::Scheme(url.scheme().to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlRejection::Credentials);
    }

    let host = url.host_str().ok_or(UrlRejection::MissingHost)?;
    if host.is_empty() {
        return Err(UrlRejection::MissingHost);
    }
    if is_private_host(host) {
        return Err(UrlRejection::PrivateHost(host.to_string()));
    }

    Ok(url)
}

fn is_private_host(host: &str) -> bool {
    let lowered = host.to_ascii_lowercase();
    let lowered = lowered.trim_end_matches('.');
    if lowered == "localhost" || lowered.ends_with(".localhost") {
        return true;
    }

    let bare = lowered.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().is_ok_and(|ip| !is_public_ip(ip))
}

/// Publicly routable address
///
/// Used on resolved addresses too, since a public name can point anywhere.
#[must_use]
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => !is_private_v4(ip),
        IpAddr::V6(ip) => !is_private_v6(ip),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // carrier-grade NAT 100.64.0.0/10
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Guard deliverable content against empty or hallucinated placeholders
///
/// Rejected content is replaced by the mission's gathered intel, or by
/// [`MISSION_FAILED_FALLBACK`] when nothing was gathered.
#[must_use]
pub fn integrity_check(content: &str, current_intel: &str) -> String {
    let lowered = content.to_lowercase();
    let rejected = content.trim().is_empty()
        || content.chars().count() < MIN_CONTENT_LEN
        || FORBIDDEN_MARKERS.iter().any(|m| lowered.contains(m));

    if !rejected {
        return content.to_string();
    }

    tracing::warn!("Data integrity check failed");
    if current_intel.is_empty() {
        MISSION_FAILED_FALLBACK.to_string()
    } else {
        current_intel.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn accepts_public_http_urls() {
        let url = validate_url(" https://lambdalabs.com/service/gpu-cloud ").unwrap();
        assert_eq!(url.host_str(), Some("lambdalabs.com"));
        assert!(validate_url("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn rejects_bad_schemes_and_shapes() {
        assert_eq!(validate_url(""), Err(UrlRejection::Empty));
        assert!(matches!(validate_url("lambdalabs.com"), Err(UrlRejection::Malformed(_))));
        assert_eq!(
            validate_url("file:///etc/passwd"),
            Err(UrlRejection::Scheme("file".to_string()))
        );
        assert_eq!(
            validate_url("https://user:pw@example.com"),
            Err(UrlRejection::Credentials)
        );
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        assert_eq!(validate_url(&long), Err(UrlRejection::TooLong(MAX_URL_LEN)));
    }

    #[test]
    fn rejects_private_hosts() {
        for url in [
            "http://localhost:8000/health",
            "http://api.localhost/",
            "http://127.0.0.1/",
            "http://10.0.0.5/",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "http://100.64.1.1/",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://[::ffff:127.0.0.1]/",
            "http://localhost.:8000/",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlRejection::PrivateHost(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn public_ip_classification() {
        assert!(is_public_ip(IpAddr::from([93, 184, 216, 34])));
        assert!(is_public_ip("2606:4700::1111".parse().unwrap()));
        assert!(!is_public_ip(IpAddr::from([127, 0, 0, 1])));
        assert!(!is_public_ip(IpAddr::from([172, 16, 4, 2])));
        assert!(!is_public_ip("fe80::1".parse().unwrap()));
        assert!(!is_public_ip("::ffff:10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn integrity_check_passes_real_content() {
        let content = "Lambda Labs lists H100 SXM at $2.49/hr with on-demand availability.";
        assert_eq!(integrity_check(content, "intel"), content);
    }

    #[test]
    fn integrity_check_falls_back() {
        assert_eq!(integrity_check("too short", "gathered intel"), "gathered intel");
        assert_eq!(
            integrity_check(
                "Synthesize all H100 pricing found into a report here as a placeholder.",
                ""
            ),
            MISSION_FAILED_FALLBACK
        );
        assert_eq!(
            integrity_check(
                "An ERROR occurred while producing the quarterly GPU pricing summary.",
                "pool"
            ),
            "pool"
        );
    }

    proptest! {
        #[test]
        fn prop_short_content_never_passes(content in ".{0,49}", intel in ".*") {
            let out = integrity_check(&content, &intel);
            if intel.is_empty() {
                prop_assert_eq!(out, MISSION_FAILED_FALLBACK);
            } else {
                prop_assert_eq!(out, intel);
            }
        }
    }
}

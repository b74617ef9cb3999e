//! Endpoint URL validation
//!
//! The signaling endpoints carry credentials (the resource key on the sessions
//! call, the ephemeral key on the negotiation call), so configured URLs must be
//! absolute HTTP(S) URLs with a host. Plain HTTP is accepted for loopback hosts
//! only; anything else is logged as a warning.

use std::net::IpAddr;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be HTTP or HTTPS, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Checks if a URL host is the local machine.
pub fn is_loopback_host(host: &url::Host<&str>) -> bool {
    match host {
        url::Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        url::Host::Ipv4(ip) => IpAddr::V4(*ip).is_loopback(),
        url::Host::Ipv6(ip) => IpAddr::V6(*ip).is_loopback(),
    }
}

/// Validates a signaling endpoint URL.
///
/// # Returns
/// * `Ok(Url)` with the parsed URL
/// * `Err(UrlValidationError)` if the URL is malformed, not HTTP(S) or has no host
///
/// # Example
/// ```rust,ignore
/// use helly_voice::utils::url_validation::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://example.openai.azure.com/openai").is_ok());
/// assert!(validate_endpoint_url("wss://example.com").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "https" && scheme != "http" {
        return Err(UrlValidationError::UnsupportedScheme(scheme.to_string()));
    }

    let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;

    if scheme == "http" && !is_loopback_host(&host) {
        warn!(host = %host, "Endpoint uses plain HTTP; credentials will be sent unencrypted");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_url_accepted() {
        let url = validate_endpoint_url(
            "https://res.openai.azure.com/openai/realtimeapi/sessions?api-version=2025-04-01-preview",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("res.openai.azure.com"));
    }

    #[test]
    fn test_loopback_http_accepted() {
        assert!(validate_endpoint_url("http://127.0.0.1:8080/sessions").is_ok());
        assert!(validate_endpoint_url("http://localhost:8080/sessions").is_ok());
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        assert!(matches!(
            validate_endpoint_url("wss://example.com/realtime"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "wss"
        ));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            validate_endpoint_url("not a url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(validate_endpoint_url("").is_err());
    }

    #[test]
    fn test_loopback_detection() {
        assert!(is_loopback_host(&url::Host::Domain("LOCALHOST")));
        assert!(is_loopback_host(&url::Host::Ipv6(std::net::Ipv6Addr::LOCALHOST)));
        assert!(!is_loopback_host(&url::Host::Domain("example.com")));
    }
}

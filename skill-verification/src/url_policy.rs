//! Trust-anchor policy for signing-certificate URLs
//!
//! The certificate location arrives in a request header, so it is attacker
//! controlled. Nothing is fetched unless the URL passes every rule here:
//!
//! 1. non-empty
//! 2. scheme is exactly `https`
//! 3. host is `s3.amazonaws.com` (case-insensitive)
//! 4. normalized path starts with `/echo.api/` (case-sensitive)
//! 5. an explicit port, if any, is 443

use crate::error::{VerificationError, VerificationResult};
use url::Url;

/// Scheme every certificate URL must use
pub const TRUSTED_SCHEME: &str = "https";

/// Host serving the provider's signing certificates
pub const TRUSTED_HOST: &str = "s3.amazonaws.com";

/// Path prefix identifying the official certificate location
pub const TRUSTED_PATH_PREFIX: &str = "/echo.api/";

/// Only port allowed when one is given explicitly
pub const TRUSTED_PORT: u16 = 443;

/// Returns `true` when `url` may be used to download a signing certificate.
pub fn is_valid_certificate_url(url: &str) -> bool {
    check_certificate_url(url).is_ok()
}

/// Applies the policy and hands back the parsed URL for the fetch step.
///
/// # Errors
///
/// Returns [`VerificationError::PolicyRejected`] naming the first rule that failed.
pub fn check_certificate_url(url: &str) -> VerificationResult<Url> {
    if url.is_empty() {
        return Err(VerificationError::PolicyRejected("empty URL".to_string()));
    }

    let parsed = Url::parse(url)
        .map_err(|e| VerificationError::PolicyRejected(format!("unparseable URL: {}", e)))?;

    if parsed.scheme() != TRUSTED_SCHEME {
        return Err(VerificationError::PolicyRejected(format!(
            "scheme '{}' is not {}",
            parsed.scheme(),
            TRUSTED_SCHEME
        )));
    }

    match parsed.host_str() {
        Some(host) if host.eq_ignore_ascii_case(TRUSTED_HOST) => {}
        other => {
            return Err(VerificationError::PolicyRejected(format!(
                "host '{}' is not {}",
                other.unwrap_or_default(),
                TRUSTED_HOST
            )));
        }
    }

    // Dot segments are already resolved by the parser, so `/echo.api/../x` fails here.
    if !parsed.path().starts_with(TRUSTED_PATH_PREFIX) {
        return Err(VerificationError::PolicyRejected(format!(
            "path '{}' is outside {}",
            parsed.path(),
            TRUSTED_PATH_PREFIX
        )));
    }

    // `port()` is None for the scheme default, so an explicit :443 lands there too.
    if let Some(port) = parsed.port() {
        if port != TRUSTED_PORT {
            return Err(VerificationError::PolicyRejected(format!(
                "port {} is not {}",
                port, TRUSTED_PORT
            )));
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_official_location() {
        assert!(is_valid_certificate_url(
            "https://s3.amazonaws.com/echo.api/echo-api-cert-1.pem"
        ));
        assert!(is_valid_certificate_url(
            "https://s3.amazonaws.com/echo.api/echo-api-cert-1"
        ));
    }

    #[test]
    fn test_accepts_explicit_default_port() {
        assert!(is_valid_certificate_url(
            "https://s3.amazonaws.com:443/echo.api/echo-api-cert-1"
        ));
    }

    #[test]
    fn test_host_comparison_ignores_case() {
        assert!(is_valid_certificate_url(
            "https://S3.AmazonAWS.COM/echo.api/echo-api-cert-1"
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(!is_valid_certificate_url(""));
    }

    #[test]
    fn test_rejects_plain_http() {
        assert!(!is_valid_certificate_url(
            "http://s3.amazonaws.com/echo.api/echo-api-cert-1"
        ));
    }

    #[test]
    fn test_rejects_foreign_host() {
        assert!(!is_valid_certificate_url(
            "https://evil.example/echo.api/echo-api-cert"
        ));
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com.evil.example/echo.api/echo-api-cert"
        ));
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com@evil.example/echo.api/echo-api-cert"
        ));
    }

    #[test]
    fn test_rejects_wrong_path() {
        assert!(!is_valid_certificate_url("https://s3.amazonaws.com/wrong-path"));
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com/EcHo.aPi/echo-api-cert"
        ));
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com/invalid/echo.api/echo-api-cert"
        ));
    }

    #[test]
    fn test_rejects_path_traversal_out_of_prefix() {
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com/echo.api/../invalid/echo-api-cert"
        ));
    }

    #[test]
    fn test_rejects_non_default_port() {
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com:8443/echo.api/echo-api-cert"
        ));
        assert!(!is_valid_certificate_url(
            "https://s3.amazonaws.com:563/echo.api/echo-api-cert"
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(!is_valid_certificate_url("not a url"));
        assert!(!is_valid_certificate_url("/echo.api/echo-api-cert"));
    }

    #[test]
    fn test_check_reports_rule() {
        let err = check_certificate_url("ftp://s3.amazonaws.com/echo.api/cert").unwrap_err();
        assert!(matches!(err, VerificationError::PolicyRejected(msg) if msg.contains("scheme")));
    }
}

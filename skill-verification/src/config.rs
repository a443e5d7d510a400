//! Verifier configuration
//!
//! Only operational knobs live here. The trust-anchor policy, trusted
//! identity, signature algorithm and cache lifetime are fixed constants and
//! cannot be changed through configuration.

use crate::error::{VerificationError, VerificationResult};
use std::str::FromStr;
use std::time::Duration;

/// Default timeout for downloading a signing certificate
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Maximum accepted age difference of a request timestamp (platform requirement)
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: i64 = 150;

/// Default upper bound for buffered request bodies
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Timeout for the certificate GET, covering connect and body read
    pub fetch_timeout: Duration,

    /// User agent sent with certificate downloads
    pub user_agent: String,

    /// How far a request timestamp may drift from now
    pub timestamp_tolerance: chrono::Duration,

    /// Largest request body the gateway will buffer for verification
    pub max_body_bytes: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: format!("rustcare-skill-verification/{}", env!("CARGO_PKG_VERSION")),
            timestamp_tolerance: chrono::Duration::seconds(DEFAULT_TIMESTAMP_TOLERANCE_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Recognised variables:
    /// - `SKILL_CERT_FETCH_TIMEOUT_SECONDS`
    /// - `SKILL_HTTP_USER_AGENT`
    /// - `SKILL_TIMESTAMP_TOLERANCE_SECONDS`
    /// - `SKILL_MAX_BODY_BYTES`
    ///
    /// # Errors
    ///
    /// [`VerificationError::Configuration`] when a variable is set but malformed
    /// or the resulting configuration fails [`VerifierConfig::validate`].
    pub fn from_env() -> VerificationResult<Self> {
        let mut config = Self::default();

        if let Some(secs) = parse_env::<u64>("SKILL_CERT_FETCH_TIMEOUT_SECONDS")? {
            config.fetch_timeout = Duration::from_secs(secs);
        }

        if let Ok(agent) = std::env::var("SKILL_HTTP_USER_AGENT") {
            config.user_agent = agent;
        }

        if let Some(secs) = parse_env::<i64>("SKILL_TIMESTAMP_TOLERANCE_SECONDS")? {
            config.timestamp_tolerance = chrono::Duration::seconds(secs);
        }

        if let Some(bytes) = parse_env::<usize>("SKILL_MAX_BODY_BYTES")? {
            config.max_body_bytes = bytes;
        }

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`VerificationError::Configuration`] describing the first invalid field.
    pub fn validate(&self) -> VerificationResult<()> {
        if self.fetch_timeout.is_zero() {
            return Err(VerificationError::Configuration(
                "certificate fetch timeout must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(VerificationError::Configuration(
                "user agent must not be empty".to_string(),
            ));
        }
        if self.timestamp_tolerance <= chrono::Duration::zero() {
            return Err(VerificationError::Configuration(
                "timestamp tolerance must be positive".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(VerificationError::Configuration(
                "maximum body size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> VerificationResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| VerificationError::Configuration(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VerifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timestamp_tolerance, chrono::Duration::seconds(150));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = VerifierConfig::default();
        config.fetch_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = VerifierConfig::default();
        config.timestamp_tolerance = chrono::Duration::zero();
        assert!(config.validate().is_err());

        let mut config = VerifierConfig::default();
        config.max_body_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = VerifierConfig::default();
        config.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_absent_is_none() {
        let value = parse_env::<u64>("SKILL_VERIFICATION_TEST_SURELY_UNSET").unwrap();
        assert!(value.is_none());
    }
}

//! Short-lived cache of validated signing certificates
//!
//! Entries expire a fixed 24 hours after insertion regardless of how often
//! they are read, or when the certificate itself expires if that is sooner. Expiry is evaluated lazily on lookup. Backed by `DashMap`,
//! so lookups from concurrent requests do not contend on a global lock.
//!
//! Two requests that miss at the same moment may both download and insert the
//! certificate for the same key; the later write wins and both values passed
//! validation, so the race only costs an extra download.

use crate::certificate::Certificate;
use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Namespace prepended to the certificate URL to form a cache key
pub const CERTIFICATE_CACHE_KEY_PREFIX: &str = "skill-verification:certificate:";

/// Absolute lifetime of a cache entry
pub const CERTIFICATE_CACHE_TTL_HOURS: i64 = 24;

/// Cache key for a certificate URL. The URL is used verbatim.
pub fn cache_key(cert_url: &str) -> String {
    format!("{}{}", CERTIFICATE_CACHE_KEY_PREFIX, cert_url)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    certificate: Arc<Certificate>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide certificate cache, shared behind an `Arc`
pub struct CertificateCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CertificateCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl: Duration::hours(CERTIFICATE_CACHE_TTL_HOURS),
        }
    }

    /// Cached certificate for `key`, or `None` if absent or expired
    pub fn get(&self, key: &str) -> Option<Arc<Certificate>> {
        let now = self.clock.now();
        let certificate = {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(Arc::clone(&entry.certificate));
            }
            Arc::clone(&entry.certificate)
        };

        // Only evict the entry we saw expire; a concurrent `set` may have replaced it.
        self.entries
            .remove_if(key, |_, entry| Arc::ptr_eq(&entry.certificate, &certificate));
        tracing::debug!(cache_key = key, "evicted expired certificate");
        None
    }

    /// Insert or replace the certificate for `key`, expiring 24 hours from now
    /// or at the certificate's `not_after`, whichever comes first
    pub fn set(&self, key: impl Into<String>, certificate: Arc<Certificate>) {
        let expires_at = (self.clock.now() + self.ttl).min(certificate.not_after());
        self.entries.insert(
            key.into(),
            CacheEntry {
                certificate,
                expires_at,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    const PROVIDER_CERT: &str = include_str!("../tests/fixtures/provider_cert.pem");
    const ROTATED_CERT: &str = include_str!("../tests/fixtures/rotated_cert.pem");

    fn setup() -> (Arc<FixedClock>, CertificateCache) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        ));
        let cache = CertificateCache::new(clock.clone());
        (clock, cache)
    }

    fn cert(pem: &str) -> Arc<Certificate> {
        Arc::new(Certificate::from_pem(pem.as_bytes()).unwrap())
    }

    #[test]
    fn test_cache_key_is_prefix_plus_url() {
        assert_eq!(
            cache_key("https://s3.amazonaws.com/echo.api/echo-api-cert.pem"),
            "skill-verification:certificate:https://s3.amazonaws.com/echo.api/echo-api-cert.pem"
        );
        assert_eq!(cache_key(""), CERTIFICATE_CACHE_KEY_PREFIX);
        assert_ne!(cache_key("https://a/echo.api/1"), cache_key("https://a/echo.api/2"));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_, cache) = setup();
        assert!(cache.get("absent").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let (_, cache) = setup();
        let c = cert(PROVIDER_CERT);
        cache.set("k", c.clone());
        let got = cache.get("k").unwrap();
        assert!(Arc::ptr_eq(&got, &c));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expiry_is_absolute_not_sliding() {
        let (clock, cache) = setup();
        cache.set("k", cert(PROVIDER_CERT));

        clock.advance(Duration::hours(23));
        assert!(cache.get("k").is_some());

        // Reads do not extend the lifetime
        clock.advance(Duration::minutes(59));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::minutes(1));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn test_entry_does_not_outlive_certificate() {
        let (clock, cache) = setup();
        let c = cert(PROVIDER_CERT);
        clock.set(c.not_after() - Duration::hours(1));
        cache.set("k", c);

        clock.advance(Duration::minutes(59));
        assert!(cache.get("k").is_some());

        clock.advance(Duration::minutes(1));
        assert!(cache.get("k").is_none(), "entry ends at the certificate's not_after");
    }

    #[test]
    fn test_overwrite_supersedes_and_restamps() {
        let (clock, cache) = setup();
        cache.set("k", cert(PROVIDER_CERT));

        clock.advance(Duration::hours(20));
        let rotated = cert(ROTATED_CERT);
        cache.set("k", rotated.clone());
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::hours(20));
        let got = cache.get("k").unwrap();
        assert_eq!(got.fingerprint(), rotated.fingerprint());
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = setup();
        cache.set("old", cert(PROVIDER_CERT));
        clock.advance(Duration::hours(12));
        cache.set("new", cert(ROTATED_CERT));
        clock.advance(Duration::hours(13));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }
}

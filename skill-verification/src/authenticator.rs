//! Request authentication entry point
//!
//! Verification first tries the cached certificate for the URL. Only when
//! there is no cached certificate, or the cached one does not verify the
//! signature (tampering, or the provider rotated its signing key), is the
//! certificate downloaded and validated again. The fresh certificate replaces
//! the cached one and the signature is checked exactly once more; that second
//! answer is final.
//!
//! Every failure collapses to `false` so callers cannot tell a bad signature
//! from an expired certificate or an unreachable host.

use crate::blocking;
use crate::cache::{cache_key, CertificateCache};
use crate::clock::Clock;
use crate::config::VerifierConfig;
use crate::error::VerificationResult;
use crate::fetcher::CertificateFetcher;
use crate::signature::check_signature;
use crate::url_policy::is_valid_certificate_url;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One inbound request to authenticate; borrowed for the duration of the call
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    /// Raw request body bytes, exactly as received
    pub payload: &'a [u8],
    /// Base64 signature from the request headers
    pub signature_b64: &'a str,
    /// Signing certificate location from the request headers
    pub cert_url: &'a str,
}

pub struct RequestAuthenticator {
    cache: Arc<CertificateCache>,
    fetcher: CertificateFetcher,
}

impl RequestAuthenticator {
    pub fn new(cache: Arc<CertificateCache>, fetcher: CertificateFetcher) -> Self {
        Self { cache, fetcher }
    }

    /// Authenticator downloading certificates over HTTPS with a fresh cache
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built from `config`.
    pub fn http(config: &VerifierConfig, clock: Arc<dyn Clock>) -> VerificationResult<Self> {
        let cache = Arc::new(CertificateCache::new(Arc::clone(&clock)));
        let fetcher = CertificateFetcher::http(config, clock)?;
        Ok(Self::new(cache, fetcher))
    }

    pub fn cache(&self) -> &Arc<CertificateCache> {
        &self.cache
    }

    pub async fn verify(&self, request: &VerificationRequest<'_>) -> bool {
        self.verify_request_signature(request.payload, request.signature_b64, request.cert_url)
            .await
    }

    /// `true` only if `signature_b64` is a valid signature of `payload` made
    /// with the trusted certificate found at `cert_url`.
    pub async fn verify_request_signature(
        &self,
        payload: &[u8],
        signature_b64: &str,
        cert_url: &str,
    ) -> bool {
        if !is_valid_certificate_url(cert_url) {
            debug!(cert_url, "certificate URL rejected before lookup");
            return false;
        }

        let key = cache_key(cert_url);

        if let Some(cached) = self.cache.get(&key) {
            if check_signature(payload, signature_b64, &cached) {
                return true;
            }
            debug!(
                cache_key = %key,
                fingerprint = cached.fingerprint(),
                "signature did not verify against cached certificate, refreshing"
            );
        }

        let Some(fresh) = self.fetcher.fetch_and_validate(cert_url).await else {
            return false;
        };

        info!(cache_key = %key, fingerprint = fresh.fingerprint(), "caching signing certificate");
        self.cache.set(key, Arc::clone(&fresh));

        check_signature(payload, signature_b64, &fresh)
    }

    /// Blocking form of [`RequestAuthenticator::verify_request_signature`],
    /// running the same async implementation on a private runtime.
    ///
    /// Must not be called from inside an async runtime; doing so returns `false`.
    pub fn verify_request_signature_blocking(
        &self,
        payload: &[u8],
        signature_b64: &str,
        cert_url: &str,
    ) -> bool {
        blocking::block_on(self.verify_request_signature(payload, signature_b64, cert_url))
            .unwrap_or_else(|e| {
                warn!(cert_url, reason = e.kind(), "{}", e);
                false
            })
    }
}

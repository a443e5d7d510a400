//! Certificate download and leaf validation
//!
//! [`CertificateFetcher`] re-applies the URL policy on every call, downloads
//! the PEM document through a [`CertificateSource`], parses it and runs the
//! leaf checks. It never touches the cache; storing the result is up to the
//! caller.

use crate::blocking;
use crate::certificate::Certificate;
use crate::clock::Clock;
use crate::config::VerifierConfig;
use crate::error::{VerificationError, VerificationResult};
use crate::url_policy::check_certificate_url;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on a downloaded certificate document
pub const MAX_CERTIFICATE_BYTES: usize = 64 * 1024;

/// Transport used to download a certificate document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetch the raw body at `url`, which has already passed the URL policy
    async fn fetch(&self, url: &Url) -> VerificationResult<Vec<u8>>;
}

/// HTTPS certificate source backed by `reqwest`
pub struct HttpCertificateSource {
    client: reqwest::Client,
}

impl HttpCertificateSource {
    /// Build a client from the verifier configuration.
    ///
    /// Redirects are disabled because a redirect target has not passed the
    /// URL policy. Idle connections are not pooled so the same client can be
    /// driven from both the async and the blocking entry points.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &VerifierConfig) -> VerificationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| VerificationError::Configuration(format!("HTTP client error: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CertificateSource for HttpCertificateSource {
    async fn fetch(&self, url: &Url) -> VerificationResult<Vec<u8>> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| VerificationError::Transport(format!("request error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerificationError::Transport(format!("unexpected status {}", status)));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_CERTIFICATE_BYTES as u64)
        {
            return Err(VerificationError::Transport("certificate document too large".to_string()));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| VerificationError::Transport(format!("body read error: {}", e)))?
        {
            if body.len() + chunk.len() > MAX_CERTIFICATE_BYTES {
                return Err(VerificationError::Transport("certificate document too large".to_string()));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

/// In-memory certificate source for testing and development
///
/// Bodies are keyed by the normalized URL string and every call is counted.
pub struct StaticCertificateSource {
    documents: DashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl StaticCertificateSource {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Serve `body` at `url`, replacing any previous document
    pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.documents.insert(Self::normalize(url), body.into());
    }

    pub fn remove(&self, url: &str) {
        self.documents.remove(&Self::normalize(url));
    }

    /// Number of `fetch` calls served so far, including misses
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn normalize(url: &str) -> String {
        Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.to_string())
    }
}

impl Default for StaticCertificateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CertificateSource for StaticCertificateSource {
    async fn fetch(&self, url: &Url) -> VerificationResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url.as_str())
            .map(|body| body.value().clone())
            .ok_or_else(|| VerificationError::Transport(format!("no document at {}", url)))
    }
}

/// Downloads and validates signing certificates
pub struct CertificateFetcher {
    source: Arc<dyn CertificateSource>,
    clock: Arc<dyn Clock>,
}

impl CertificateFetcher {
    pub fn new(source: Arc<dyn CertificateSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Fetcher using [`HttpCertificateSource`]
    ///
    /// # Errors
    ///
    /// See [`HttpCertificateSource::new`].
    pub fn http(config: &VerifierConfig, clock: Arc<dyn Clock>) -> VerificationResult<Self> {
        Ok(Self::new(Arc::new(HttpCertificateSource::new(config)?), clock))
    }

    /// Validated certificate at `url`, or `None` on any policy, transport,
    /// parse or trust failure.
    pub async fn fetch_and_validate(&self, url: &str) -> Option<Arc<Certificate>> {
        match self.try_fetch_and_validate(url).await {
            Ok(certificate) => Some(certificate),
            Err(e) => {
                log_failure(url, &e);
                None
            }
        }
    }

    /// Blocking form of [`CertificateFetcher::fetch_and_validate`].
    ///
    /// Must not be called from inside an async runtime; doing so returns `None`.
    pub fn fetch_and_validate_blocking(&self, url: &str) -> Option<Arc<Certificate>> {
        blocking::block_on(self.fetch_and_validate(url)).unwrap_or_else(|e| {
            warn!(cert_url = url, reason = e.kind(), "{}", e);
            None
        })
    }

    /// Like [`CertificateFetcher::fetch_and_validate`] but keeps the failure.
    ///
    /// # Errors
    ///
    /// The [`VerificationError`] of the first failed stage.
    pub async fn try_fetch_and_validate(&self, url: &str) -> VerificationResult<Arc<Certificate>> {
        let parsed = check_certificate_url(url)?;
        let body = self.source.fetch(&parsed).await?;
        let certificate = Certificate::from_pem(&body)?;
        certificate.validate_leaf(self.clock.now())?;

        info!(
            cert_url = url,
            fingerprint = certificate.fingerprint(),
            not_after = %certificate.not_after(),
            "signing certificate validated"
        );
        Ok(Arc::new(certificate))
    }
}

fn log_failure(url: &str, error: &VerificationError) {
    match error {
        // Caller-supplied URLs are untrusted input, keep rejections quiet
        VerificationError::PolicyRejected(_) => {
            debug!(cert_url = url, reason = error.kind(), "{}", error);
        }
        _ => warn!(cert_url = url, reason = error.kind(), "{}", error),
    }
}

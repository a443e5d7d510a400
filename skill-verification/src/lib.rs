//! Verification of signed requests sent by the voice assistant skill platform
//!
//! Each request carries a base64 SHA1-with-RSA signature over its raw body and
//! the URL of the signing certificate. This crate decides whether to trust
//! such a request:
//!
//! - the certificate URL must satisfy a fixed trust-anchor policy before
//!   anything is downloaded ([`url_policy`])
//! - the downloaded certificate must be inside its validity window and name
//!   the platform's identity among its subject alternative names
//!   ([`certificate`], [`fetcher`])
//! - the signature must verify under the certificate's key ([`signature`])
//! - validated certificates are cached for 24 hours ([`cache`]); a signature
//!   that fails against a cached certificate triggers one refresh, which
//!   handles provider key rotation ([`authenticator`])
//!
//! # Example
//!
//! ```rust,no_run
//! use skill_verification::{RequestAuthenticator, SystemClock, VerifierConfig};
//! use std::sync::Arc;
//!
//! # async fn example(body: &[u8], signature: &str, cert_url: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::from_env()?;
//! let authenticator = RequestAuthenticator::http(&config, Arc::new(SystemClock))?;
//!
//! if authenticator.verify_request_signature(body, signature, cert_url).await {
//!     println!("request is authentic");
//! }
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
mod blocking;
pub mod cache;
pub mod certificate;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod signature;
pub mod timestamp;
pub mod url_policy;

pub use authenticator::{RequestAuthenticator, VerificationRequest};
pub use cache::{cache_key, CertificateCache};
pub use certificate::Certificate;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::VerifierConfig;
pub use error::{VerificationError, VerificationResult};
pub use fetcher::{CertificateFetcher, CertificateSource, HttpCertificateSource, StaticCertificateSource};
pub use signature::check_signature;
pub use timestamp::{extract_request_timestamp, is_request_fresh, is_timestamp_within_tolerance};
pub use url_policy::is_valid_certificate_url;

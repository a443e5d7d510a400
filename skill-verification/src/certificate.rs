//! Validated signing certificate
//!
//! A [`Certificate`] is produced from the PEM document served at the
//! certificate URL. Only the first `CERTIFICATE` block is used; any chain that
//! follows it is ignored.

use crate::error::{VerificationError, VerificationResult};
use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{ASN1Time, FromDer, X509Certificate};

/// Identity the provider's certificate must carry as a DNS subject alternative name
pub const TRUSTED_SUBJECT_NAME: &str = "echo-api.amazon.com";

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Parsed leaf certificate with the pieces needed for verification
#[derive(Debug, Clone)]
pub struct Certificate {
    subject: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject_alt_names: Vec<String>,
    public_key: RsaPublicKey,
    fingerprint_sha256: String,
}

impl Certificate {
    /// Parse the first certificate of a PEM document.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Parse`] when the body holds no well-formed
    /// certificate, [`VerificationError::Trust`] when its key is not RSA.
    pub fn from_pem(body: &[u8]) -> VerificationResult<Self> {
        let blocks = ::pem::parse_many(body)
            .map_err(|e| VerificationError::Parse(format!("invalid PEM: {}", e)))?;

        let block = blocks
            .iter()
            .find(|block| block.tag() == PEM_CERTIFICATE_TAG)
            .ok_or_else(|| VerificationError::Parse("no CERTIFICATE block in body".to_string()))?;

        Self::from_der(block.contents())
    }

    /// Parse a DER-encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Same as [`Certificate::from_pem`].
    pub fn from_der(der: &[u8]) -> VerificationResult<Self> {
        let (_rem, cert) = X509Certificate::from_der(der)
            .map_err(|e| VerificationError::Parse(format!("invalid X.509 certificate: {}", e)))?;

        let not_before = to_utc(cert.validity().not_before)?;
        let not_after = to_utc(cert.validity().not_after)?;

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                return Err(VerificationError::Parse(format!(
                    "malformed subject alternative name extension: {}",
                    e
                )))
            }
        };

        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| VerificationError::Trust(format!("certificate key is not RSA: {}", e)))?;

        let fingerprint_sha256 = hex::encode(Sha256::digest(der));

        Ok(Self {
            subject: cert.subject().to_string(),
            not_before,
            not_after,
            subject_alt_names,
            public_key,
            fingerprint_sha256,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// DNS subject alternative names in certificate order
    pub fn subject_alt_names(&self) -> &[String] {
        &self.subject_alt_names
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Hex SHA-256 of the DER encoding, for log correlation only
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint_sha256
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Exact, case-sensitive SAN membership
    pub fn has_subject_alt_name(&self, name: &str) -> bool {
        self.subject_alt_names.iter().any(|san| san == name)
    }

    /// Leaf trust checks: validity window, then trusted identity.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Trust`] describing the failed check.
    pub fn validate_leaf(&self, now: DateTime<Utc>) -> VerificationResult<()> {
        if now < self.not_before {
            return Err(VerificationError::Trust(format!(
                "certificate not valid before {}",
                self.not_before
            )));
        }
        if now > self.not_after {
            return Err(VerificationError::Trust(format!(
                "certificate expired at {}",
                self.not_after
            )));
        }
        if !self.has_subject_alt_name(TRUSTED_SUBJECT_NAME) {
            return Err(VerificationError::Trust(format!(
                "subject alternative names do not include {}",
                TRUSTED_SUBJECT_NAME
            )));
        }
        Ok(())
    }
}

fn to_utc(time: ASN1Time) -> VerificationResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.to_datetime().unix_timestamp(), 0)
        .ok_or_else(|| VerificationError::Parse("validity timestamp out of range".to_string()))
}

//! Detached request signature check (RSASSA-PKCS1-v1_5 with SHA-1)

use crate::certificate::Certificate;
use crate::error::{VerificationError, VerificationResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use sha1::Sha1;

/// Signature scheme identifier used by the skill platform
pub const SIGNATURE_ALGORITHM: &str = "SHA1withRSA";

/// Returns `true` when `signature_b64` is a valid signature of `payload` under
/// the certificate's key. Malformed input yields `false`, never a panic.
pub fn check_signature(payload: &[u8], signature_b64: &str, certificate: &Certificate) -> bool {
    match verify_signature(payload, signature_b64, certificate) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(
                reason = e.kind(),
                fingerprint = certificate.fingerprint(),
                "signature check failed: {}",
                e
            );
            false
        }
    }
}

/// Like [`check_signature`] but keeps the failure kind.
///
/// # Errors
///
/// [`VerificationError::SignatureFormat`] for undecodable input,
/// [`VerificationError::SignatureMismatch`] when verification fails.
pub fn verify_signature(
    payload: &[u8],
    signature_b64: &str,
    certificate: &Certificate,
) -> VerificationResult<()> {
    let raw = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| VerificationError::SignatureFormat(e.to_string()))?;

    let signature = Signature::try_from(raw.as_slice())
        .map_err(|_| VerificationError::SignatureMismatch)?;

    let verifying_key = VerifyingKey::<Sha1>::new(certificate.public_key().clone());
    verifying_key
        .verify(payload, &signature)
        .map_err(|_| VerificationError::SignatureMismatch)
}

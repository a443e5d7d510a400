//! Skill request authentication middleware
//!
//! Buffers the raw body (the signature covers the exact bytes), reads the
//! signature headers, asks the [`RequestAuthenticator`] for a verdict and
//! checks the request timestamp. Verified requests continue to the inner
//! handler with the body intact.

use crate::error::ApiError;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use skill_verification::{is_request_fresh, Clock, RequestAuthenticator, VerifierConfig};
use std::sync::Arc;
use tracing::debug;

/// Base64 signature over the raw request body
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("signature");

/// Location of the signing certificate
pub const CERT_CHAIN_URL_HEADER: HeaderName = HeaderName::from_static("signaturecertchainurl");

/// Shared state for [`verify_skill_request`]
#[derive(Clone)]
pub struct SkillRequestGuard {
    authenticator: Arc<RequestAuthenticator>,
    clock: Arc<dyn Clock>,
    config: Arc<VerifierConfig>,
}

impl SkillRequestGuard {
    pub fn new(
        authenticator: Arc<RequestAuthenticator>,
        clock: Arc<dyn Clock>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            authenticator,
            clock,
            config: Arc::new(config),
        }
    }

    pub fn authenticator(&self) -> &Arc<RequestAuthenticator> {
        &self.authenticator
    }
}

/// Use with `axum::middleware::from_fn_with_state(guard, verify_skill_request)`
///
/// # Errors
///
/// `400` for missing headers, unreadable bodies or stale timestamps, `413` for
/// oversized bodies and `401` when the signature cannot be verified.
pub async fn verify_skill_request(
    State(guard): State<SkillRequestGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let signature = required_header(&parts.headers, &SIGNATURE_HEADER)?;
    let cert_url = required_header(&parts.headers, &CERT_CHAIN_URL_HEADER)?;

    let max_body_bytes = guard.config.max_body_bytes;
    let declared_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > max_body_bytes) {
        return Err(ApiError::payload_too_large(format!(
            "request body exceeds {} bytes",
            max_body_bytes
        )));
    }

    let bytes = to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| ApiError::bad_request(format!("request body could not be read: {}", e)))?;

    if !guard
        .authenticator
        .verify_request_signature(&bytes, &signature, &cert_url)
        .await
    {
        return Err(ApiError::authentication("request signature could not be verified"));
    }

    if !is_request_fresh(&bytes, guard.clock.now(), guard.config.timestamp_tolerance) {
        return Err(ApiError::bad_request("request timestamp is missing or outside tolerance"));
    }

    debug!(cert_url = %cert_url, body_len = bytes.len(), "skill request verified");
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn required_header(headers: &HeaderMap, name: &HeaderName) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("missing {} header", name)))
}

//! HTTP message signature verification for configuration requests.
//!
//! The CI server signs every request with its Ed25519 key following the
//! draft-cavage HTTP signatures scheme. The signature covers the
//! `(request-target)` pseudo-header and the `Date` header.
//!
//! Provides:
//! - `SignatureVerifier` -- checks a request against a public key and returns
//!   the key id asserted by the signer
//! - `AuthContext` -- verifier + key store + expected key id, the unit the
//!   HTTP layer authenticates against
//! - `sign_request()` -- the signing side, for clients and tests

pub mod params;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use http::{HeaderMap, Method, Uri};

use crate::keys::{KeyError, PublicKeyStore};
use params::SignatureParams;

/// Headers every accepted signature must cover.
pub const REQUIRED_HEADERS: &[&str] = &["(request-target)", "date"];

/// Pseudo-header standing for the method and path.
const REQUEST_TARGET: &str = "(request-target)";

/// Algorithm names verified as Ed25519.
const SUPPORTED_ALGORITHMS: &[&str] = &["ed25519", "hs2019"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while authenticating a request.
///
/// Messages are for server-side logs only; HTTP responses carry a generic
/// text instead.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither `Signature` nor `Authorization: Signature` present.
    #[error("missing signature")]
    MissingSignature,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// A required header is not covered by the signature.
    #[error("missing required header in signature: {0}")]
    UncoveredHeader(String),

    /// A covered header is absent from the request.
    #[error("missing header in request: {0}")]
    MissingHeader(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("unexpected key id '{actual}' (expected '{expected}')")]
    KeyIdMismatch { expected: String, actual: String },

    /// The public key could not be loaded; a server-side problem.
    #[error("public key unavailable: {0}")]
    KeyUnavailable(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Signing string
// ---------------------------------------------------------------------------

/// Build the signing input for `covered` headers, in the given order.
pub fn signing_string(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    covered: &[String],
) -> Result<String, AuthError> {
    let mut lines = Vec::with_capacity(covered.len());

    for name in covered {
        if name == REQUEST_TARGET {
            let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
            lines.push(format!(
                "{REQUEST_TARGET}: {} {target}",
                method.as_str().to_ascii_lowercase()
            ));
            continue;
        }

        let values = headers
            .get_all(name.as_str())
            .iter()
            .map(|v| {
                v.to_str()
                    .map(str::trim)
                    .map_err(|_| AuthError::MalformedSignature(format!("header '{name}' is not text")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(AuthError::MissingHeader(name.clone()));
        }
        lines.push(format!("{name}: {}", values.join(", ")));
    }

    Ok(lines.join("\n"))
}

/// Extract the raw signature parameter list from the request headers.
fn signature_header(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(value) = headers.get(http::header::AUTHORIZATION) {
        if let Some(params) = value.to_str().ok().and_then(|v| v.strip_prefix("Signature ")) {
            return Ok(params);
        }
    }

    headers
        .get("signature")
        .ok_or(AuthError::MissingSignature)?
        .to_str()
        .map_err(|_| AuthError::MalformedSignature("signature header is not text".to_string()))
}

// ---------------------------------------------------------------------------
// SignatureVerifier
// ---------------------------------------------------------------------------

/// Verifies request signatures against a fixed set of required headers.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    required_headers: Vec<String>,
}

impl SignatureVerifier {
    pub fn new<S: AsRef<str>>(required_headers: &[S]) -> Self {
        Self {
            required_headers: required_headers
                .iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// Verify the request signature with `key`.
    ///
    /// Returns the key id asserted by the signer. The caller decides whether
    /// that id is acceptable.
    pub fn verify(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        key: &VerifyingKey,
    ) -> Result<String, AuthError> {
        let params = SignatureParams::parse(signature_header(headers)?)?;

        if let Some(missing) = self
            .required_headers
            .iter()
            .find(|required| !params.headers.contains(required))
        {
            return Err(AuthError::UncoveredHeader(missing.clone()));
        }

        if !SUPPORTED_ALGORITHMS.contains(&params.algorithm.as_str()) {
            return Err(AuthError::UnsupportedAlgorithm(params.algorithm));
        }

        let signature = Signature::from_slice(&params.signature)
            .map_err(|_| AuthError::MalformedSignature("signature must be 64 bytes".to_string()))?;
        let message = signing_string(method, uri, headers, &params.headers)?;

        key.verify(message.as_bytes(), &signature)
            .map_err(|_| AuthError::VerificationFailed)?;

        Ok(params.key_id)
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(REQUIRED_HEADERS)
    }
}

// ---------------------------------------------------------------------------
// AuthContext
// ---------------------------------------------------------------------------

/// Everything needed to authenticate a request: verifier, key and the key id
/// the CI server is expected to sign with. Read-only during request handling.
#[derive(Debug, Clone)]
pub struct AuthContext {
    verifier: SignatureVerifier,
    keys: Arc<PublicKeyStore>,
    expected_key_id: String,
}

impl AuthContext {
    pub fn new(keys: Arc<PublicKeyStore>, expected_key_id: impl Into<String>) -> Self {
        Self {
            verifier: SignatureVerifier::default(),
            keys,
            expected_key_id: expected_key_id.into(),
        }
    }

    pub fn keys(&self) -> &Arc<PublicKeyStore> {
        &self.keys
    }

    pub fn expected_key_id(&self) -> &str {
        &self.expected_key_id
    }

    /// Verify the request and check the asserted key id.
    pub async fn authenticate(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<String, AuthError> {
        let key = self.keys.current().await?;
        let key_id = self.verifier.verify(method, uri, headers, &key)?;

        if key_id != self.expected_key_id {
            return Err(AuthError::KeyIdMismatch {
                expected: self.expected_key_id.clone(),
                actual: key_id,
            });
        }
        Ok(key_id)
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Compute the `Signature` header value for a request.
///
/// `headers` must already contain every covered header except
/// `(request-target)`.
pub fn sign_request(
    key: &SigningKey,
    key_id: &str,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    covered: &[&str],
) -> Result<String, AuthError> {
    let covered: Vec<String> = covered.iter().map(|h| h.to_ascii_lowercase()).collect();
    let message = signing_string(method, uri, headers, &covered)?;
    let signature = key.sign(message.as_bytes());

    Ok(format!(
        r#"keyId="{key_id}",algorithm="ed25519",headers="{}",signature="{}""#,
        covered.join(" "),
        STANDARD.encode(signature.to_bytes())
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

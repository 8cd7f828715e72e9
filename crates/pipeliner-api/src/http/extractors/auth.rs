//! Request signature extractor.
//!
//! Verifies the HTTP signature the CI server attaches to every
//! configuration-extension call. Handlers that take [`Verified`] only run
//! for requests signed with the configured public key and key id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pipeliner_infra::signature::AuthError;

use crate::http::error::AppError;
use crate::state::AppState;

const INVALID_OR_MISSING: &str = "Invalid or Missing Signature";
const INVALID_SIGNATURE: &str = "Invalid Signature";
const KEY_UNAVAILABLE: &str = "Signature verification unavailable";

/// Verified request marker.
pub struct Verified {
    /// Key id asserted by the signer; `None` when verification is disabled.
    pub key_id: Option<String>,
}

impl FromRequestParts<AppState> for Verified {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth) = &state.auth else {
            return Ok(Verified { key_id: None });
        };

        match auth
            .authenticate(&parts.method, &parts.uri, &parts.headers)
            .await
        {
            Ok(key_id) => Ok(Verified {
                key_id: Some(key_id),
            }),
            Err(AuthError::KeyUnavailable(e)) => {
                tracing::error!(error = %e, "public key unavailable, rejecting request");
                Err(AppError::Internal(KEY_UNAVAILABLE.to_string()))
            }
            Err(e @ AuthError::KeyIdMismatch { .. }) => {
                tracing::warn!(error = %e, "request signed with unexpected key id");
                Err(AppError::Unauthorized(INVALID_SIGNATURE.to_string()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "signature verification failed");
                tracing::debug!(headers = ?parts.headers, "rejected request headers");
                Err(AppError::Unauthorized(INVALID_OR_MISSING.to_string()))
            }
        }
    }
}

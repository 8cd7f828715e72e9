//! Configuration-extension endpoint.
//!
//! The CI server posts the repository and pipeline it is about to run. When
//! the repository matches the override filter, the pipeline is rebuilt from
//! the repository's flake and returned; otherwise the server answers 204 and
//! the CI server keeps its own configuration.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeliner_core::resolver::Resolution;
use pipeliner_types::request::IncomingRequest;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::extractors::auth::Verified;
use crate::state::AppState;

/// POST / - Resolve the pipeline for an incoming CI request.
pub async fn serve_pipeline(
    State(state): State<AppState>,
    verified: Verified,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let body = body.map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "failed to read request body");
        AppError::BadRequest("can't read body".to_string())
    })?;

    if state.config.debug {
        tracing::debug!(
            request_id = %request_id,
            body = %String::from_utf8_lossy(&body),
            "incoming request"
        );
    }

    let request: IncomingRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "failed to parse request");
        AppError::BadRequest(format!("Failed to parse JSON: {e}"))
    })?;

    tracing::info!(
        request_id = %request_id,
        repo = %request.repo.name,
        git_ref = %request.pipeline.git_ref,
        commit = %request.pipeline.commit,
        key_id = verified.key_id.as_deref().unwrap_or("-"),
        "pipeline requested"
    );

    let cancel = state.shutdown.child_token();
    let result = state.resolver.resolve(&request, &cancel).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Resolution::Pipeline(pipeline)) => {
            if state.config.debug {
                tracing::debug!(
                    request_id = %request_id,
                    pipeline = %String::from_utf8_lossy(&pipeline),
                    "serving pipeline"
                );
            }
            tracing::info!(request_id = %request_id, elapsed_ms, "pipeline served");
            Ok((StatusCode::OK, pipeline).into_response())
        }
        Ok(Resolution::NoOverride) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                repo = %request.repo.name,
                elapsed_ms,
                error = %e,
                "pipeline resolution failed"
            );
            if state.config.report_build_failures {
                Err(AppError::Internal("Failed to build pipeline".to_string()))
            } else {
                Ok(StatusCode::NO_CONTENT.into_response())
            }
        }
    }
}

//! Application error type mapping to HTTP status codes.
//!
//! Bodies are short plaintext messages. Anything that could reveal key
//! material, configuration or build internals stays in the server log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Unreadable or unparsable request.
    BadRequest(String),
    /// Missing or invalid request signature. Answered with 400, which is what
    /// the CI server expects from a configuration extension.
    Unauthorized(String),
    /// Server-side failure.
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Unauthorized(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::Internal(msg) => msg,
        };

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

//! HTTP layer for Pipeliner.
//!
//! Axum-based server exposing the configuration-extension endpoint at `/`
//! plus a health check.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;

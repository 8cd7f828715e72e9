//! Shared domain types for Pipeliner.
//!
//! This crate contains the types exchanged between the CI server, the
//! resolver and the HTTP layer: the incoming request model, the server
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod request;

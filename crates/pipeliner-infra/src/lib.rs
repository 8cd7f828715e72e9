//! Infrastructure layer for Pipeliner.
//!
//! Contains the implementations behind the ports defined in `pipeliner-core`
//! plus the request authentication machinery: a bash-backed command runner,
//! the Ed25519 public key store, and HTTP message signature verification.

pub mod keys;
pub mod shell;
pub mod signature;

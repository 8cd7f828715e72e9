//! Pipeline resolution logic for Pipeliner.
//!
//! This crate defines the [`command::CommandRunner`] port that the
//! infrastructure layer implements, plus the pure pieces of the resolution
//! flow (repository filter, build reference) and the [`resolver`] that ties
//! them together. It depends only on `pipeliner-types` -- never on
//! `pipeliner-infra` or any HTTP crate.

pub mod command;
pub mod filter;
pub mod reference;
pub mod resolver;

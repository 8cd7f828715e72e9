//! Observability setup for Pipeliner: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;

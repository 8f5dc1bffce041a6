//! Observability setup for Relaydesk: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;

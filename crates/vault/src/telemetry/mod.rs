//! Telemetry setup: structured JSON logs plus optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No payloads or key material** in any span attribute or log field. Tokens
//!   are digests and may be logged.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};

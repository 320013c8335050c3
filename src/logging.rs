//! # Logging
//!
//! Initializes the `tracing` subscriber used by both binaries. Respects
//! `RUST_LOG` via `EnvFilter`, defaulting to `info` when unset.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber. Call once at process start.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}

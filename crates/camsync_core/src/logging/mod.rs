//! Logging infrastructure for camsync.
//!
//! This module provides:
//! - Per-unit loggers with file + callback dual output
//! - Tail buffer of transcoder output for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! Library code logs through `tracing` with a bracketed component prefix
//! (`[Optical]`, `[Audio]`, `[Reconcile]`, `[Export]`); human-facing run
//! logs go through [`UnitLogger`].

mod types;
mod unit_logger;

pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
pub use unit_logger::UnitLogger;
pub(crate) use unit_logger::sanitize_filename;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG` and falls back to the provided default level.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

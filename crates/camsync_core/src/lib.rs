//! camsync core - multi-camera LED/audio synchronization engine
//!
//! This crate contains all engine logic with zero UI dependencies: optical
//! start detection, audio alignment, reconciliation of the two, and the
//! trim/export plan handed to the transcoder.

pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod export;
pub mod logging;
pub mod models;
pub mod optical;
pub mod orchestrator;
pub mod reconcile;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

//! Configuration management for camsync.
//!
//! This module provides:
//! - TOML-based engine settings with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Per-unit files describing cameras, merged into [`SyncParams`]
//!
//! # Example
//!
//! ```no_run
//! use camsync_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("camsync.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Threshold: {}", config.settings().detection.threshold);
//!
//! config.settings_mut().reconcile.tolerance = 3;
//! config.update_section(ConfigSection::Reconcile).unwrap();
//! ```

mod manager;
mod settings;
mod unit;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, ConfigSection, DetectionSettings, ExportSettings, LoggingSettings,
    PathSettings, ReconcileSettings, Settings,
};
pub use unit::{CameraConfig, SyncParams, UnitConfig};

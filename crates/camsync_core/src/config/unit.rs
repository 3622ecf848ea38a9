//! Per-unit configuration.
//!
//! A synchronization unit is described by its own TOML file:
//!
//! ```toml
//! name = "20250314-Pici-TS-1"
//! kind = "trial"
//! threshold = 175
//!
//! [[cameras]]
//! index = 1
//! path = "cam1/C0527.MP4"
//! roi = [550, 148, 75, 71]
//! led = "Y"
//! ```
//!
//! Overrides in the unit file win over the global [`Settings`]; the result
//! is a [`SyncParams`] value owned by the run, never process-wide state.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manager::{ConfigError, ConfigResult};
use super::settings::Settings;
use crate::models::{CameraIndex, FrameNumber, LedColor, Roi, UnitKind};

/// Descriptor of one camera within a unit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub index: u8,
    pub path: PathBuf,
    /// `[x, y, width, height]` in pixels.
    pub roi: [u32; 4],
    pub led: LedColor,
    /// Output file name; defaults to `<unit>-cam<index>.mp4`.
    #[serde(default)]
    pub output_name: Option<String>,
    /// Start frame recorded by hand, skips optical detection.
    #[serde(default)]
    pub known_start: Option<FrameNumber>,
}

impl CameraConfig {
    pub fn camera(&self) -> CameraIndex {
        CameraIndex(self.index)
    }

    pub fn roi(&self) -> Roi {
        Roi::from(self.roi)
    }

    /// Output file name, falling back to the unit naming convention.
    pub fn output_name(&self, unit_name: &str) -> String {
        self.output_name
            .clone()
            .unwrap_or_else(|| format!("{}-cam{}.mp4", unit_name, self.index))
    }
}

/// One synchronization unit as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default)]
    pub kind: UnitKind,
    #[serde(default)]
    pub threshold: Option<u8>,
    #[serde(default)]
    pub tolerance: Option<i64>,
    #[serde(default)]
    pub nominal_fps: Option<f64>,
    pub cameras: Vec<CameraConfig>,
}

impl UnitConfig {
    /// Read and validate a unit file.
    ///
    /// Relative camera paths are resolved against the unit file's folder.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let mut unit: UnitConfig = toml::from_str(&content)?;

        if let Some(base) = path.parent() {
            for camera in &mut unit.cameras {
                if camera.path.is_relative() {
                    camera.path = base.join(&camera.path);
                }
            }
        }

        unit.validate()?;
        Ok(unit)
    }

    /// Check the structural invariants a run relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("unit name is empty"));
        }
        if self.cameras.len() < 2 {
            return Err(self.invalid(format!(
                "at least two cameras are required, got {}",
                self.cameras.len()
            )));
        }

        let mut indices = HashSet::new();
        let mut outputs = HashSet::new();
        for camera in &self.cameras {
            if camera.index == 0 {
                return Err(self.invalid("camera indices are 1-based"));
            }
            if !indices.insert(camera.index) {
                return Err(self.invalid(format!("duplicate camera index {}", camera.index)));
            }
            if camera.roi().is_empty() {
                return Err(self.invalid(format!("cam{} has an empty ROI", camera.index)));
            }
            if !outputs.insert(camera.output_name(&self.name)) {
                return Err(self.invalid(format!(
                    "cam{} reuses output name '{}'",
                    camera.index,
                    camera.output_name(&self.name)
                )));
            }
        }

        if let Some(fps) = self.nominal_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(self.invalid(format!("nominal_fps must be positive, got {}", fps)));
            }
        }
        if let Some(tolerance) = self.tolerance {
            if tolerance < 0 {
                return Err(self.invalid("tolerance must not be negative"));
            }
        }
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidUnit {
            unit: self.name.clone(),
            message: message.into(),
        }
    }
}

/// Explicit parameter set for one synchronization unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncParams {
    /// Brightness threshold applied to every camera in the unit.
    pub threshold: u8,
    /// Frames examined per camera before detection gives up.
    pub search_horizon: u64,
    /// Seconds a frame read may block before the source counts as stalled.
    pub frame_timeout_secs: u64,
    /// Deviation tolerance in frames.
    pub tolerance: i64,
    /// Nominal frame rate for audio offset conversion.
    pub nominal_fps: f64,
    pub sample_rate: u32,
    pub excerpt_start_secs: f64,
    pub excerpt_secs: f64,
    pub hop_length: usize,
    pub frame_length: usize,
}

impl SyncParams {
    /// Merge unit overrides into the global settings.
    pub fn resolve(settings: &Settings, unit: &UnitConfig) -> Self {
        Self {
            threshold: unit.threshold.unwrap_or(settings.detection.threshold),
            search_horizon: settings.detection.search_horizon,
            frame_timeout_secs: settings.detection.frame_timeout_secs,
            tolerance: unit.tolerance.unwrap_or(settings.reconcile.tolerance),
            nominal_fps: unit.nominal_fps.unwrap_or(settings.audio.nominal_fps),
            sample_rate: settings.audio.sample_rate,
            excerpt_start_secs: settings.audio.excerpt_start_secs,
            excerpt_secs: settings.audio.excerpt_secs,
            hop_length: settings.audio.hop_length,
            frame_length: settings.audio.frame_length,
        }
    }
}

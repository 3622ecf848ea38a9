//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::TranscodeProfile;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path and tool settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Optical LED detection.
    #[serde(default)]
    pub detection: DetectionSettings,

    /// Audio cross-check.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Reconciliation of optical and audio evidence.
    #[serde(default)]
    pub reconcile: ReconcileSettings,

    /// Trim/re-encode of the aligned outputs.
    #[serde(default)]
    pub export: ExportSettings,
}

/// Output folders and external tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for synchronized outputs (one subfolder per unit).
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for brightness traces, detection frames and waveform plots.
    #[serde(default = "default_diagnostics_folder")]
    pub diagnostics_folder: String,

    /// Folder for per-unit log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// FFmpeg executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// FFprobe executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_output_folder() -> String {
    "SynchronizedVideos".to_string()
}

fn default_diagnostics_folder() -> String {
    "SynchronizedVideos/SyncDetection".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            diagnostics_folder: default_diagnostics_folder(),
            logs_folder: default_logs_folder(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to unit logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Echo unit log lines to stdout.
    #[serde(default = "default_true")]
    pub echo: bool,

    /// Number of transcoder output lines replayed on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix unit log lines with a wall-clock timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            echo: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// Optical LED detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Brightness threshold on the 0-255 V channel.
    #[serde(default = "default_threshold")]
    pub threshold: u8,

    /// Number of frames examined before giving up on a camera.
    #[serde(default = "default_search_horizon")]
    pub search_horizon: u64,

    /// Seconds to wait for a single decoded frame before treating the source as stalled.
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout_secs: u64,

    /// Write brightness traces and detection frames.
    #[serde(default = "default_true")]
    pub write_diagnostics: bool,
}

fn default_threshold() -> u8 {
    175
}

fn default_search_horizon() -> u64 {
    4500
}

fn default_frame_timeout() -> u64 {
    30
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            search_horizon: default_search_horizon(),
            frame_timeout_secs: default_frame_timeout(),
            write_diagnostics: true,
        }
    }
}

/// Audio alignment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Sample rate audio excerpts are resampled to.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Length of each excerpt in seconds.
    #[serde(default = "default_excerpt_secs")]
    pub excerpt_secs: f64,

    /// Wall-clock offset of the excerpt within each recording.
    #[serde(default)]
    pub excerpt_start_secs: f64,

    /// Samples between consecutive envelope frames.
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,

    /// Samples per RMS window.
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,

    /// Nominal video frame rate used to convert seconds to frames.
    #[serde(default = "default_nominal_fps")]
    pub nominal_fps: f64,

    /// Seconds shown in the waveform comparison plot.
    #[serde(default = "default_waveform_plot_secs")]
    pub waveform_plot_secs: f64,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_excerpt_secs() -> f64 {
    30.0
}

fn default_hop_length() -> usize {
    128
}

fn default_frame_length() -> usize {
    2048
}

fn default_nominal_fps() -> f64 {
    119.88
}

fn default_waveform_plot_secs() -> f64 {
    10.0
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            excerpt_secs: default_excerpt_secs(),
            excerpt_start_secs: 0.0,
            hop_length: default_hop_length(),
            frame_length: default_frame_length(),
            nominal_fps: default_nominal_fps(),
            waveform_plot_secs: default_waveform_plot_secs(),
        }
    }
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Maximum tolerated disagreement between optical and audio starts, in frames.
    #[serde(default = "default_tolerance")]
    pub tolerance: i64,
}

fn default_tolerance() -> i64 {
    5
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
        }
    }
}

/// Export (trim + re-encode) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Encoder profile.
    #[serde(default)]
    pub profile: TranscodeProfile,

    /// Output width in pixels.
    #[serde(default = "default_output_width")]
    pub output_width: u32,

    /// Output height in pixels.
    #[serde(default = "default_output_height")]
    pub output_height: u32,

    /// Constant rate factor for the software profile.
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Encoder preset shared by both profiles.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Target bitrate for the hardware profile.
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Plan and log the transcoder commands without running them.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_output_width() -> u32 {
    1920
}

fn default_output_height() -> u32 {
    1080
}

fn default_crf() -> u8 {
    18
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_bitrate() -> String {
    "5M".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            profile: TranscodeProfile::default(),
            output_width: default_output_width(),
            output_height: default_output_height(),
            crf: default_crf(),
            preset: default_preset(),
            bitrate: default_bitrate(),
            dry_run: false,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Detection,
    Audio,
    Reconcile,
    Export,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Detection,
        ConfigSection::Audio,
        ConfigSection::Reconcile,
        ConfigSection::Export,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Detection => "detection",
            ConfigSection::Audio => "audio",
            ConfigSection::Reconcile => "reconcile",
            ConfigSection::Export => "export",
        }
    }

    /// Comment written above the section.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output folders and external tools",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Detection => "Optical LED detection",
            ConfigSection::Audio => "Audio cross-check",
            ConfigSection::Reconcile => "Optical/audio reconciliation",
            ConfigSection::Export => "Trim and re-encode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[detection]"));
        assert!(toml.contains("[reconcile]"));
        assert!(toml.contains("threshold = 175"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[detection]\nthreshold = 200";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.detection.threshold, 200);
        assert_eq!(parsed.detection.search_horizon, 4500);
        assert_eq!(parsed.reconcile.tolerance, 5);
        assert_eq!(parsed.audio.hop_length, 128);
        assert_eq!(parsed.export.profile, TranscodeProfile::Software);
    }

    #[test]
    fn export_profile_reads_lowercase() {
        let parsed: Settings = toml::from_str("[export]\nprofile = \"hardware\"").unwrap();
        assert_eq!(parsed.export.profile, TranscodeProfile::Hardware);
    }
}

//! Core types for audio alignment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SyncParams;
use crate::models::CameraIndex;

/// Mono audio excerpt.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Parameters of the envelope correlation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioParams {
    pub sample_rate: u32,
    /// Samples between envelope frames.
    pub hop_length: usize,
    /// Samples per RMS window.
    pub frame_length: usize,
    /// Frame rate used to convert the time offset into frames.
    pub fps: f64,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            hop_length: 128,
            frame_length: 2048,
            fps: 119.88,
        }
    }
}

impl From<&SyncParams> for AudioParams {
    fn from(params: &SyncParams) -> Self {
        Self {
            sample_rate: params.sample_rate,
            hop_length: params.hop_length,
            frame_length: params.frame_length,
            fps: params.nominal_fps,
        }
    }
}

/// Audio-derived start offset of one camera relative to the reference camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioOffset {
    pub camera: CameraIndex,
    /// Signed offset in video frames.
    pub frames: i64,
    /// Correlation lag in envelope hops.
    pub lag_hops: i64,
    /// Offset in seconds before frame rounding.
    pub seconds: f64,
    pub sample_rate: u32,
    pub hop_length: usize,
    pub fps: f64,
}

impl AudioOffset {
    /// The anchor camera's offset, zero by construction.
    pub fn reference(camera: CameraIndex, params: &AudioParams) -> Self {
        Self {
            camera,
            frames: 0,
            lag_hops: 0,
            seconds: 0.0,
            sample_rate: params.sample_rate,
            hop_length: params.hop_length,
            fps: params.fps,
        }
    }
}

/// Errors that can occur during audio alignment.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Audio excerpt for {0} is empty")]
    Empty(CameraIndex),

    #[error("Sample rate mismatch: reference at {reference} Hz, {camera} at {target} Hz")]
    SampleRateMismatch {
        camera: CameraIndex,
        reference: u32,
        target: u32,
    },

    #[error("Invalid audio parameters: {0}")]
    InvalidParams(String),

    #[error("No audio excerpts to align")]
    NoExcerpts,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

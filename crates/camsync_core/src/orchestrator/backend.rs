//! Access to decoded media.
//!
//! The runner never spawns processes itself; it asks a [`MediaBackend`]
//! for probes, frame sources and audio excerpts. [`FfmpegBackend`] is the
//! production implementation.

use std::path::Path;
use std::time::Duration;

use crate::audio::{extract_excerpt, AudioData, AudioResult};
use crate::config::Settings;
use crate::models::{CameraStream, VideoInfo};
use crate::optical::{probe_video, FfmpegFrameSource, FfmpegSourceConfig, FrameError, FrameSource};

pub trait MediaBackend: Send + Sync {
    /// Declared properties of a video file.
    fn probe(&self, path: &Path) -> Result<VideoInfo, FrameError>;

    /// Sequential frames of a camera, at most `max_frames` of them.
    fn open_frames(
        &self,
        stream: &CameraStream,
        max_frames: u64,
    ) -> Result<Box<dyn FrameSource>, FrameError>;

    /// Mono audio excerpt of a camera.
    fn audio_excerpt(
        &self,
        stream: &CameraStream,
        start_secs: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> AudioResult<AudioData>;
}

/// Media access through the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
    frame_timeout: Duration,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, frame_timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            frame_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.paths.ffmpeg.clone(),
            settings.paths.ffprobe.clone(),
            Duration::from_secs(settings.detection.frame_timeout_secs),
        )
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<VideoInfo, FrameError> {
        probe_video(&self.ffprobe, path)
    }

    fn open_frames(
        &self,
        stream: &CameraStream,
        max_frames: u64,
    ) -> Result<Box<dyn FrameSource>, FrameError> {
        let config = FfmpegSourceConfig {
            ffmpeg: self.ffmpeg.clone(),
            frame_timeout: self.frame_timeout,
            max_frames: Some(max_frames),
        };
        let source = FfmpegFrameSource::open(&stream.path, stream.info, &config)?;
        Ok(Box::new(source))
    }

    fn audio_excerpt(
        &self,
        stream: &CameraStream,
        start_secs: f64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> AudioResult<AudioData> {
        extract_excerpt(&self.ffmpeg, &stream.path, start_secs, duration_secs, sample_rate)
    }
}

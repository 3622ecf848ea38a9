//! Sequential frame sources.
//!
//! The detector only ever walks forward through a stream, so the trait is
//! a fallible iterator plus the declared stream properties.

use std::collections::VecDeque;
use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

/// Errors raised while opening or reading a frame source.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("Failed to probe {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("Frame {index} could not be decoded: {message}")]
    DecodeFailed { index: u64, message: String },

    #[error("No frame arrived within {timeout_secs}s (after {frames_read} frames)")]
    Stalled { timeout_secs: u64, frames_read: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for sequential frame readers.
pub trait FrameSource: Send {
    /// Next decoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError>;

    /// Declared frame rate.
    fn fps(&self) -> f64;

    /// Declared total frame count.
    fn frame_count(&self) -> u64;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Short name for log messages.
    fn name(&self) -> &str;
}

/// Frame source over frames already held in memory.
pub struct MemoryFrameSource {
    name: String,
    frames: VecDeque<RgbImage>,
    total: u64,
    fps: f64,
    width: u32,
    height: u32,
}

impl MemoryFrameSource {
    pub fn new(name: impl Into<String>, frames: Vec<RgbImage>, fps: f64) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        Self {
            name: name.into(),
            total: frames.len() as u64,
            frames: frames.into(),
            fps,
            width,
            height,
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError> {
        Ok(self.frames.pop_front())
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.total
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_yields_frames_in_order() {
        let frames = (0..3u8)
            .map(|i| RgbImage::from_pixel(2, 2, image::Rgb([i, i, i])))
            .collect();
        let mut source = MemoryFrameSource::new("mem", frames, 120.0);

        assert_eq!(source.frame_count(), 3);
        assert_eq!((source.width(), source.height()), (2, 2));
        for i in 0..3u8 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0).0, [i, i, i]);
        }
        assert!(source.next_frame().unwrap().is_none());
    }
}

//! Optical event detection.
//!
//! Each camera's frames are scanned strictly in order inside its ROI. The
//! score of a frame is the brightest pixel whose hue and saturation fall in
//! the LED colour's band. The first lit frame after the LED has been seen
//! dark is the synchronization event.

mod detector;
mod ffmpeg;
pub mod hsv;
mod source;

pub use detector::{detect_start, DetectorConfig, EdgeTracker, OpticalDetection, OpticalError};
pub use ffmpeg::{probe_video, FfmpegFrameSource, FfmpegSourceConfig};
pub use source::{FrameError, FrameSource, MemoryFrameSource};

//! Data models for the synchronization engine.
//!
//! This module contains the structures shared by every stage:
//! - Enums for LED colours, unit kinds and transcode profiles
//! - Camera identity, regions of interest and stream descriptors
//! - Frame numbering (the single zero-based to one-based conversion)

mod camera;
mod enums;
mod frames;

pub use camera::{CameraIndex, CameraStream, Roi, VideoInfo};
pub use enums::{HsvBand, LedColor, TranscodeProfile, UnitKind};
pub use frames::{FrameIndex, FrameNumber};

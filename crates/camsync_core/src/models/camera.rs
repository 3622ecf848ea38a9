//! Camera identity, regions of interest and stream descriptors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::LedColor;
use super::frames::FrameNumber;

/// One-based camera identity within a synchronization unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraIndex(pub u8);

impl std::fmt::Display for CameraIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cam{}", self.0)
    }
}

/// Rectangle in pixel coordinates where the LED is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with a frame of the given size.
    ///
    /// A region lying completely outside the frame comes back with zero area.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Roi {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        let right = self.x.saturating_add(self.width).min(frame_width);
        let bottom = self.y.saturating_add(self.height).min(frame_height);
        Roi {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<[u32; 4]> for Roi {
    fn from(v: [u32; 4]) -> Self {
        Roi::new(v[0], v[1], v[2], v[3])
    }
}

/// Probed properties of a video file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Declared number of frames.
    pub frame_count: u64,
    /// Declared frame rate.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// One camera's recording within a synchronization unit.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraStream {
    pub index: CameraIndex,
    pub path: PathBuf,
    pub roi: Roi,
    pub led: LedColor,
    /// File name of the trimmed output, relative to the unit output folder.
    pub output_name: String,
    /// Start frame recorded by a human; skips optical detection.
    pub known_start: Option<FrameNumber>,
    pub info: VideoInfo,
}

impl CameraStream {
    /// Declared total frames as a signed frame count.
    pub fn total_frames(&self) -> FrameNumber {
        self.info.frame_count as FrameNumber
    }
}

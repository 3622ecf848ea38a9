//! Per-camera brightness trace.

use serde::{Deserialize, Serialize};

use super::svg::{self, Panel};
use crate::models::{CameraIndex, FrameNumber};
use crate::optical::OpticalDetection;

/// Serialized brightness trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessTrace {
    pub unit: String,
    pub camera: CameraIndex,
    pub source: String,
    pub threshold: u8,
    pub start_frame: Option<FrameNumber>,
    /// Score per scanned frame, starting at frame 1.
    pub scores: Vec<u8>,
}

impl BrightnessTrace {
    pub fn from_detection(unit: &str, source: &str, detection: &OpticalDetection) -> Self {
        Self {
            unit: unit.to_string(),
            camera: detection.camera,
            source: source.to_string(),
            threshold: detection.threshold,
            start_frame: detection.start_frame(),
            scores: detection.trace.clone(),
        }
    }

    /// Line plot with the threshold and the detected start marked.
    pub fn to_svg(&self, line_color: &str) -> String {
        let values: Vec<f64> = self.scores.iter().map(|&s| s as f64).collect();
        let title = match self.start_frame {
            Some(start) => format!("{} {} start frame {}", self.unit, self.camera, start),
            None => format!("{} {} no start within {} frames", self.unit, self.camera, self.scores.len()),
        };
        let panel = Panel {
            title: format!("{} (threshold {})", self.source, self.threshold),
            values: &values,
            y_range: (0.0, 255.0),
            color: line_color,
            hline: Some((self.threshold as f64, "red")),
            vline: self
                .start_frame
                .and_then(|s| usize::try_from(s - 1).ok())
                .map(|i| (i, "black")),
        };
        svg::render(&title, &[panel], 300.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_carries_start_and_threshold() {
        let mut detection = OpticalDetection::missing(CameraIndex(3), vec![10, 20, 200], 175);
        detection.edge = Some(crate::models::FrameIndex(2));
        let trace = BrightnessTrace::from_detection("unit", "C0688.MP4", &detection);
        assert_eq!(trace.start_frame, Some(3));

        let svg = trace.to_svg("orange");
        assert!(svg.contains("start frame 3"));
        assert!(svg.contains("stroke=\"red\""));
        assert!(svg.contains("stroke=\"orange\""));
    }
}

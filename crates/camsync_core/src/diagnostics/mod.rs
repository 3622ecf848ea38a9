//! Write-only diagnostic artifacts for human review.
//!
//! Nothing here is read back by the engine. [`DiagnosticsWriter`] logs
//! failures as warnings and carries on, so a full disk or an unwritable
//! folder never fails a unit.

mod brightness;
mod frame;
mod svg;
mod waveform;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use brightness::BrightnessTrace;
pub use frame::annotate_detection;
pub use waveform::{aligned_window, render_waveforms};

use crate::audio::{AudioData, AudioOffset};
use crate::logging::sanitize_filename;
use crate::models::{CameraIndex, CameraStream};
use crate::optical::OpticalDetection;

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes one unit's diagnostic files into a folder.
#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    dir: PathBuf,
    unit: String,
}

impl DiagnosticsWriter {
    pub fn new(dir: impl Into<PathBuf>, unit: &str) -> Self {
        Self {
            dir: dir.into(),
            unit: sanitize_filename(unit),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Brightness JSON and SVG, plus the annotated frame when a start was found.
    pub fn write_optical(&self, stream: &CameraStream, detection: &OpticalDetection) -> Vec<PathBuf> {
        match self.try_write_optical(stream, detection) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(
                    "[Diagnostics] {} artifacts not written: {}",
                    detection.camera,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Waveform comparison of every camera's excerpt.
    pub fn write_waveforms(
        &self,
        tracks: &[(CameraIndex, &AudioData)],
        offsets: &[AudioOffset],
        duration_secs: f64,
    ) -> Option<PathBuf> {
        let svg = render_waveforms(&self.unit, tracks, offsets, duration_secs);
        let path = self.dir.join(format!("audio_comp_{}.svg", self.unit));
        match std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, svg)) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("[Diagnostics] waveform plot not written: {}", e);
                None
            }
        }
    }

    fn try_write_optical(
        &self,
        stream: &CameraStream,
        detection: &OpticalDetection,
    ) -> Result<Vec<PathBuf>, DiagnosticsError> {
        std::fs::create_dir_all(&self.dir)?;

        let source = stream
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| stream.index.to_string());
        let trace = BrightnessTrace::from_detection(&self.unit, &source, detection);
        let stem = format!("brightness_{}_{}", self.unit, detection.camera);

        let json_path = self.dir.join(format!("{}.json", stem));
        std::fs::write(&json_path, serde_json::to_string(&trace)?)?;

        let svg_path = self.dir.join(format!("{}.svg", stem));
        std::fs::write(&svg_path, trace.to_svg(stream.led.plot_color()))?;

        let mut paths = vec![json_path, svg_path];

        if let (Some(frame), Some(start)) = (&detection.detection_frame, detection.start_frame()) {
            let annotated = annotate_detection(frame, &stream.roi, stream.led);
            let jpg_path = self.dir.join(format!(
                "detection_{}_{}_{}.jpg",
                self.unit, detection.camera, start
            ));
            annotated.save(&jpg_path)?;
            paths.push(jpg_path);
        }

        tracing::debug!(
            "[Diagnostics] {} wrote {} files to {}",
            detection.camera,
            paths.len(),
            self.dir.display()
        );
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameIndex, LedColor, Roi, VideoInfo};
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn stream() -> CameraStream {
        CameraStream {
            index: CameraIndex(1),
            path: PathBuf::from("/raw/cam1/C0527.MP4"),
            roi: Roi::new(1, 1, 4, 4),
            led: LedColor::Yellow,
            output_name: "u-cam1.mp4".into(),
            known_start: None,
            info: VideoInfo {
                frame_count: 100,
                fps: 119.88,
                width: 8,
                height: 8,
            },
        }
    }

    #[test]
    fn writes_trace_and_detection_frame() {
        let dir = tempdir().unwrap();
        let writer = DiagnosticsWriter::new(dir.path(), "2025/03/14 TS-1");
        let detection = OpticalDetection {
            camera: CameraIndex(1),
            edge: Some(FrameIndex(41)),
            trace: vec![0; 42],
            threshold: 175,
            detection_frame: Some(RgbImage::from_pixel(8, 8, Rgb([10, 10, 10]))),
        };

        let paths = writer.write_optical(&stream(), &detection);
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.exists()));
        assert!(paths[2]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_cam1_42.jpg"));
        assert!(!paths[0].to_string_lossy().contains("2025/03"));
    }

    #[test]
    fn missing_detection_writes_trace_only() {
        let dir = tempdir().unwrap();
        let writer = DiagnosticsWriter::new(dir.path(), "u");
        let detection = OpticalDetection::missing(CameraIndex(1), vec![1, 2, 3], 175);
        assert_eq!(writer.write_optical(&stream(), &detection).len(), 2);
    }

    #[test]
    fn unwritable_folder_is_not_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let writer = DiagnosticsWriter::new(blocker.join("sub"), "u");
        let detection = OpticalDetection::missing(CameraIndex(1), vec![1], 175);
        assert!(writer.write_optical(&stream(), &detection).is_empty());
        assert!(writer.write_waveforms(&[], &[], 1.0).is_none());
    }
}

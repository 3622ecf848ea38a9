//! Trim plan derived from the reconciled starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CameraIndex, CameraStream, FrameNumber};
use crate::reconcile::{FailureKind, ReconciledStart, StartStatus};

/// Errors raised while planning or running the export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("frame count mismatch: {limiting} has {output_frames} frames left after its start")]
    FrameCountMismatch {
        output_frames: i64,
        limiting: CameraIndex,
    },

    #[error("{camera} has negative start frame {start}")]
    NegativeStart {
        camera: CameraIndex,
        start: FrameNumber,
    },

    #[error("no camera stream for reconciled {0}")]
    UnknownCamera(CameraIndex),

    #[error("nothing to export")]
    Empty,

    #[error("transcode of {camera} failed with exit code {exit_code}: {message}")]
    TranscodeFailed {
        camera: CameraIndex,
        exit_code: i32,
        message: String,
    },

    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize plan: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ExportError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ExportError::FrameCountMismatch { .. } => Some(FailureKind::FrameCountMismatch),
            ExportError::NegativeStart { .. }
            | ExportError::UnknownCamera(_)
            | ExportError::Empty => Some(FailureKind::InvalidInput),
            _ => None,
        }
    }
}

/// Trim parameters of one camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraExport {
    pub camera: CameraIndex,
    pub input: PathBuf,
    pub output: PathBuf,
    pub start_frame: FrameNumber,
    pub status: StartStatus,
    pub fps: f64,
    /// Seek position in seconds.
    pub seek_secs: f64,
}

impl CameraExport {
    /// Seek time as passed to the transcoder.
    pub fn seek_arg(&self) -> String {
        format!("{:.6}", self.seek_secs)
    }
}

/// Shared output length plus per-camera trims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPlan {
    pub output_frames: u64,
    pub cameras: Vec<CameraExport>,
}

/// Compute the common output length and every camera's seek.
pub fn plan_export(
    starts: &[ReconciledStart],
    cameras: &[CameraStream],
    output_dir: &Path,
) -> Result<ExportPlan, ExportError> {
    if starts.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut exports = Vec::with_capacity(starts.len());
    let mut shortest: Option<(CameraIndex, i64)> = None;

    for start in starts {
        let stream = cameras
            .iter()
            .find(|c| c.index == start.camera)
            .ok_or(ExportError::UnknownCamera(start.camera))?;

        if start.start < 0 {
            return Err(ExportError::NegativeStart {
                camera: start.camera,
                start: start.start,
            });
        }

        let remaining = stream.total_frames() - start.start;
        if shortest.map_or(true, |(_, r)| remaining < r) {
            shortest = Some((start.camera, remaining));
        }

        exports.push(CameraExport {
            camera: start.camera,
            input: stream.path.clone(),
            output: output_dir.join(&stream.output_name),
            start_frame: start.start,
            status: start.status,
            fps: stream.info.fps,
            seek_secs: start.start as f64 / stream.info.fps,
        });
    }

    let (limiting, output_frames) = shortest.ok_or(ExportError::Empty)?;
    if output_frames <= 0 {
        return Err(ExportError::FrameCountMismatch {
            output_frames,
            limiting,
        });
    }

    tracing::info!(
        "[Export] {} cameras, {} output frames (limited by {})",
        exports.len(),
        output_frames,
        limiting
    );

    Ok(ExportPlan {
        output_frames: output_frames as u64,
        cameras: exports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LedColor, Roi, VideoInfo};

    fn stream(index: u8, frames: u64) -> CameraStream {
        CameraStream {
            index: CameraIndex(index),
            path: PathBuf::from(format!("/raw/cam{index}/C0001.MP4")),
            roi: Roi::new(0, 0, 10, 10),
            led: LedColor::Yellow,
            output_name: format!("unit-cam{index}.mp4"),
            known_start: None,
            info: VideoInfo {
                frame_count: frames,
                fps: 119.88,
                width: 1920,
                height: 1080,
            },
        }
    }

    fn reconciled(starts: &[i64]) -> Vec<ReconciledStart> {
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| ReconciledStart {
                camera: CameraIndex(i as u8 + 1),
                start,
                status: StartStatus::Ok,
            })
            .collect()
    }

    fn streams(frames: &[u64]) -> Vec<CameraStream> {
        frames
            .iter()
            .enumerate()
            .map(|(i, &f)| stream(i as u8 + 1, f))
            .collect()
    }

    #[test]
    fn output_length_is_shortest_remainder() {
        let plan = plan_export(
            &reconciled(&[10, 12, 8, 9]),
            &streams(&[1000, 1000, 1000, 1000]),
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(plan.output_frames, 988);
        assert_eq!(plan.cameras[1].output, PathBuf::from("/out/unit-cam2.mp4"));
        assert_eq!(plan.cameras[0].seek_arg(), "0.083417");
    }

    #[test]
    fn start_at_last_frame_is_mismatch() {
        let err = plan_export(
            &reconciled(&[10, 1000, 8, 9]),
            &streams(&[1000, 1000, 1000, 1000]),
            Path::new("/out"),
        )
        .unwrap_err();
        match err {
            ExportError::FrameCountMismatch { limiting, .. } => assert_eq!(limiting, CameraIndex(2)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn negative_start_is_rejected() {
        let err = plan_export(&reconciled(&[-1, 5]), &streams(&[100, 100]), Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, ExportError::NegativeStart { .. }));
        assert_eq!(err.kind(), Some(FailureKind::InvalidInput));
    }

    #[test]
    fn unknown_camera_is_rejected() {
        let err = plan_export(&reconciled(&[1, 2, 3]), &streams(&[100, 100]), Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, ExportError::UnknownCamera(CameraIndex(3))));
    }
}

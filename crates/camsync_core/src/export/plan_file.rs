//! `sync_plan.json`, the record of how a unit was synchronized.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::plan::{ExportError, ExportPlan};
use crate::audio::AudioOffset;
use crate::config::SyncParams;
use crate::models::{CameraIndex, FrameNumber, UnitKind};
use crate::optical::OpticalDetection;
use crate::reconcile::{ReconcileReport, StartStatus};

/// File name of the plan inside a unit's output folder.
pub const SYNC_PLAN_FILE: &str = "sync_plan.json";

/// One camera's line in the plan file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub camera: CameraIndex,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Optical start as detected, if any.
    pub optical_start: Option<FrameNumber>,
    pub audio_offset: Option<i64>,
    pub start_frame: FrameNumber,
    pub status: StartStatus,
    pub seek_secs: f64,
}

/// Contents of `sync_plan.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlanRecord {
    pub unit: String,
    pub kind: UnitKind,
    pub created: String,
    pub threshold: u8,
    pub tolerance: i64,
    pub output_frames: u64,
    pub report: ReconcileReport,
    pub cameras: Vec<CameraRecord>,
}

impl SyncPlanRecord {
    pub fn new(
        unit: &str,
        kind: UnitKind,
        params: &SyncParams,
        plan: &ExportPlan,
        optical: &[OpticalDetection],
        audio: &[AudioOffset],
        report: &ReconcileReport,
    ) -> Self {
        let cameras = plan
            .cameras
            .iter()
            .map(|c| CameraRecord {
                camera: c.camera,
                input: c.input.clone(),
                output: c.output.clone(),
                optical_start: optical
                    .iter()
                    .find(|d| d.camera == c.camera)
                    .and_then(|d| d.start_frame()),
                audio_offset: audio.iter().find(|a| a.camera == c.camera).map(|a| a.frames),
                start_frame: c.start_frame,
                status: c.status,
                seek_secs: c.seek_secs,
            })
            .collect();

        Self {
            unit: unit.to_string(),
            kind,
            created: Local::now().to_rfc3339(),
            threshold: params.threshold,
            tolerance: params.tolerance,
            output_frames: plan.output_frames,
            report: report.clone(),
            cameras,
        }
    }

    /// Write to `<dir>/sync_plan.json`, returning the path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir).map_err(|e| ExportError::io("creating output directory", e))?;
        let path = dir.join(SYNC_PLAN_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| ExportError::io("writing sync plan", e))?;
        tracing::debug!("[Export] Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioParams;
    use crate::export::CameraExport;
    use crate::reconcile::ReconcileState;
    use tempfile::tempdir;

    fn params() -> SyncParams {
        SyncParams {
            threshold: 175,
            search_horizon: 4500,
            frame_timeout_secs: 30,
            tolerance: 5,
            nominal_fps: 119.88,
            sample_rate: 48000,
            excerpt_start_secs: 0.0,
            excerpt_secs: 30.0,
            hop_length: 128,
            frame_length: 2048,
        }
    }

    #[test]
    fn writes_plan_json() {
        let dir = tempdir().unwrap();
        let plan = ExportPlan {
            output_frames: 988,
            cameras: vec![CameraExport {
                camera: CameraIndex(2),
                input: PathBuf::from("/raw/b.mp4"),
                output: dir.path().join("u-cam2.mp4"),
                start_frame: 12,
                status: StartStatus::FilledFromAudio,
                fps: 119.88,
                seek_secs: 12.0 / 119.88,
            }],
        };
        let audio = vec![AudioOffset {
            frames: 2,
            ..AudioOffset::reference(CameraIndex(2), &AudioParams::default())
        }];
        let optical = vec![OpticalDetection::missing(CameraIndex(2), vec![0, 0], 175)];
        let report = ReconcileReport {
            state: Some(ReconcileState::OneMissing),
            tolerance: 5,
            offset_estimate: 10,
            ..ReconcileReport::default()
        };

        let record =
            SyncPlanRecord::new("u", UnitKind::Trial, &params(), &plan, &optical, &audio, &report);
        let path = record.write(dir.path()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: SyncPlanRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.output_frames, 988);
        assert_eq!(back.cameras[0].optical_start, None);
        assert_eq!(back.cameras[0].audio_offset, Some(2));
        assert!(text.contains("filled-from-audio"));
    }
}

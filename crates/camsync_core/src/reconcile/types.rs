//! Reconciliation results and terminal failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::ReconcileState;
use crate::models::{CameraIndex, FrameNumber};

/// How a camera's final start was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartStatus {
    /// Optical start accepted as detected.
    Ok,
    /// No optical start; taken from audio.
    FilledFromAudio,
    /// Optical start disagreed with audio and was replaced.
    CorrectedDeviation,
}

impl std::fmt::Display for StartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StartStatus::Ok => "ok",
            StartStatus::FilledFromAudio => "filled-from-audio",
            StartStatus::CorrectedDeviation => "corrected-deviation",
        })
    }
}

/// Final start frame of one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledStart {
    pub camera: CameraIndex,
    /// One-based start frame.
    pub start: FrameNumber,
    pub status: StartStatus,
}

/// Failure categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    AmbiguousDeviation,
    InsufficientEvidence,
    FrameCountMismatch,
    InvalidInput,
}

/// Deviation of one camera's optical start from its audio estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    pub camera: CameraIndex,
    pub frames: i64,
}

fn list(deviations: &[Deviation]) -> String {
    deviations
        .iter()
        .map(|d| format!("{}={}", d.camera, d.frames))
        .collect::<Vec<_>>()
        .join(", ")
}

fn cams(cameras: &[CameraIndex]) -> String {
    cameras
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal reconciliation failure for one unit.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncFailure {
    #[error(
        "ambiguous: {} disagree with audio (deviations {}, offset estimate {offset_estimate})",
        cams(.cameras), list(.deviations)
    )]
    AmbiguousDeviation {
        cameras: Vec<CameraIndex>,
        deviations: Vec<Deviation>,
        offset_estimate: i64,
    },

    #[error(
        "ambiguous after filling {}: {} disagree with audio (deviations {}, offset estimate {offset_estimate})",
        cams(.filled), cams(.cameras), list(.deviations)
    )]
    AmbiguousAfterFill {
        filled: Vec<CameraIndex>,
        cameras: Vec<CameraIndex>,
        deviations: Vec<Deviation>,
        offset_estimate: i64,
    },

    #[error(
        "insufficient evidence: {} missing and valid {} disagree (deviations {}, offset estimate {offset_estimate})",
        cams(.missing), cams(.valid), list(.deviations)
    )]
    InsufficientEvidence {
        missing: Vec<CameraIndex>,
        valid: Vec<CameraIndex>,
        deviations: Vec<Deviation>,
        offset_estimate: i64,
    },

    #[error(
        "one of two cameras deviates: {camera} (deviations {}, offset estimate {offset_estimate})",
        list(.deviations)
    )]
    TwoCameraDeviation {
        camera: CameraIndex,
        deviations: Vec<Deviation>,
        offset_estimate: i64,
    },

    #[error("camera sets differ: optical [{}], audio [{}]", cams(.optical), cams(.audio))]
    CameraSetMismatch {
        optical: Vec<CameraIndex>,
        audio: Vec<CameraIndex>,
    },

    #[error("at least two cameras are required, got {count}")]
    TooFewCameras { count: usize },
}

impl SyncFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncFailure::AmbiguousDeviation { .. }
            | SyncFailure::AmbiguousAfterFill { .. }
            | SyncFailure::TwoCameraDeviation { .. } => FailureKind::AmbiguousDeviation,
            SyncFailure::InsufficientEvidence { .. } => FailureKind::InsufficientEvidence,
            SyncFailure::CameraSetMismatch { .. } | SyncFailure::TooFewCameras { .. } => {
                FailureKind::InvalidInput
            }
        }
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// One start per camera, ordered by camera index.
    Synced(Vec<ReconciledStart>),
    Failed(SyncFailure),
}

impl SyncOutcome {
    pub fn starts(&self) -> Option<&[ReconciledStart]> {
        match self {
            SyncOutcome::Synced(starts) => Some(starts),
            SyncOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&SyncFailure> {
        match self {
            SyncOutcome::Synced(_) => None,
            SyncOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Vec<ReconciledStart>, SyncFailure> {
        match self {
            SyncOutcome::Synced(starts) => Ok(starts),
            SyncOutcome::Failed(failure) => Err(failure),
        }
    }
}

/// Intermediate values of a reconciliation, kept for logs and the plan file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub state: Option<ReconcileState>,
    pub tolerance: i64,
    /// Optical start minus audio offset, per valid camera.
    pub residuals: Vec<(CameraIndex, i64)>,
    pub offset_estimate: i64,
    /// Deviations from the last check performed.
    pub deviations: Vec<Deviation>,
    /// Uniform shift applied to keep every start at or above 1.
    pub shift: i64,
    pub warnings: Vec<String>,
}

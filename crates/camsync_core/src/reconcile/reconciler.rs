//! Merging optical starts with audio offsets.

use std::collections::BTreeMap;

use super::state::ReconcileState;
use super::types::{
    Deviation, ReconcileReport, ReconciledStart, StartStatus, SyncFailure, SyncOutcome,
};
use crate::audio::AudioOffset;
use crate::models::{CameraIndex, FrameNumber};
use crate::optical::OpticalDetection;

/// Evidence for one camera after joining the two result sets.
#[derive(Debug, Clone, Copy)]
struct Evidence {
    camera: CameraIndex,
    optical: Option<FrameNumber>,
    audio: i64,
}

impl Evidence {
    fn audio_start(&self, offset_estimate: i64) -> FrameNumber {
        offset_estimate + self.audio
    }
}

/// Working start of one camera while a branch runs.
#[derive(Debug, Clone, Copy)]
struct Slot {
    evidence: Evidence,
    start: Option<FrameNumber>,
    status: StartStatus,
}

impl Slot {
    fn deviation(&self, offset_estimate: i64) -> Option<i64> {
        self.start
            .map(|s| (s - self.evidence.audio_start(offset_estimate)).abs())
    }

    fn fill(&mut self, offset_estimate: i64) {
        self.start = Some(self.evidence.audio_start(offset_estimate));
        self.status = StartStatus::FilledFromAudio;
    }

    fn correct(&mut self, offset_estimate: i64) {
        self.start = Some(self.evidence.audio_start(offset_estimate));
        self.status = StartStatus::CorrectedDeviation;
    }
}

/// Median of the residuals, taking the element at `len / 2` after sorting.
///
/// For an even count this is the upper of the two middle values.
pub fn median_residual(residuals: &[i64]) -> Option<i64> {
    if residuals.is_empty() {
        return None;
    }
    let mut sorted = residuals.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}

/// Reconcile optical and audio evidence into one start per camera.
pub fn reconcile(optical: &[OpticalDetection], audio: &[AudioOffset], tolerance: i64) -> SyncOutcome {
    reconcile_with_report(optical, audio, tolerance).0
}

/// [`reconcile`], also returning the intermediate values.
pub fn reconcile_with_report(
    optical: &[OpticalDetection],
    audio: &[AudioOffset],
    tolerance: i64,
) -> (SyncOutcome, ReconcileReport) {
    let mut report = ReconcileReport {
        tolerance,
        ..ReconcileReport::default()
    };

    let evidence = match join(optical, audio) {
        Ok(evidence) => evidence,
        Err(failure) => return (SyncOutcome::Failed(failure), report),
    };

    let Some(state) = ReconcileState::classify(
        evidence.len(),
        evidence.iter().filter(|e| e.optical.is_none()).count(),
    ) else {
        let failure = SyncFailure::TooFewCameras {
            count: evidence.len(),
        };
        return (SyncOutcome::Failed(failure), report);
    };
    report.state = Some(state);

    report.residuals = evidence
        .iter()
        .filter_map(|e| e.optical.map(|s| (e.camera, s - e.audio)))
        .collect();
    let residuals: Vec<i64> = report.residuals.iter().map(|(_, r)| *r).collect();
    let offset_estimate = median_residual(&residuals).unwrap_or(0);
    report.offset_estimate = offset_estimate;

    tracing::debug!(
        "[Reconcile] state {}, residuals {:?}, offset estimate {}",
        state,
        report.residuals,
        offset_estimate
    );

    let mut slots: Vec<Slot> = evidence
        .iter()
        .map(|&e| Slot {
            evidence: e,
            start: e.optical,
            status: StartStatus::Ok,
        })
        .collect();

    let result = match state {
        ReconcileState::AllPresent => {
            all_present(&mut slots, offset_estimate, tolerance, &mut report)
        }
        ReconcileState::OneMissing => {
            one_missing(&mut slots, offset_estimate, tolerance, &mut report)
        }
        ReconcileState::TwoMissing => {
            several_missing(&mut slots, offset_estimate, tolerance, &mut report)
        }
        ReconcileState::ThreeMissing => {
            report.warnings.push(format!(
                "only one camera has an optical start; {} filled from audio without cross-check",
                missing_cameras(&slots).len()
            ));
            fill_missing(&mut slots, offset_estimate);
            Ok(())
        }
        ReconcileState::AllMissing => {
            report
                .warnings
                .push("no optical starts; every camera filled from audio".to_string());
            fill_and_floor(&mut slots, offset_estimate, &mut report);
            Ok(())
        }
        ReconcileState::TwoCameraPartial => {
            report.warnings.push(
                "two-camera unit with a missing optical start; using audio starts".to_string(),
            );
            fill_and_floor(&mut slots, offset_estimate, &mut report);
            Ok(())
        }
        ReconcileState::TwoCameraComplete => {
            two_camera_complete(&slots, offset_estimate, tolerance, &mut report)
        }
    };

    for warning in &report.warnings {
        tracing::warn!("[Reconcile] {}", warning);
    }

    match result {
        Ok(()) => {
            let starts = slots
                .iter()
                .filter_map(|s| {
                    s.start.map(|start| ReconciledStart {
                        camera: s.evidence.camera,
                        start,
                        status: s.status,
                    })
                })
                .collect();
            (SyncOutcome::Synced(starts), report)
        }
        Err(failure) => {
            tracing::warn!("[Reconcile] {}", failure);
            (SyncOutcome::Failed(failure), report)
        }
    }
}

/// Pair each optical detection with the audio offset of the same camera.
fn join(optical: &[OpticalDetection], audio: &[AudioOffset]) -> Result<Vec<Evidence>, SyncFailure> {
    let optical_map: BTreeMap<CameraIndex, Option<FrameNumber>> =
        optical.iter().map(|d| (d.camera, d.start_frame())).collect();
    let audio_map: BTreeMap<CameraIndex, i64> =
        audio.iter().map(|a| (a.camera, a.frames)).collect();

    let duplicated = optical_map.len() != optical.len() || audio_map.len() != audio.len();
    if duplicated || !optical_map.keys().eq(audio_map.keys()) {
        return Err(SyncFailure::CameraSetMismatch {
            optical: optical.iter().map(|d| d.camera).collect(),
            audio: audio.iter().map(|a| a.camera).collect(),
        });
    }

    Ok(optical_map
        .into_iter()
        .zip(audio_map.values())
        .map(|((camera, optical), &audio)| Evidence {
            camera,
            optical,
            audio,
        })
        .collect())
}

/// Deviations of every camera that currently has a start.
fn deviations(slots: &[Slot], offset_estimate: i64) -> Vec<Deviation> {
    slots
        .iter()
        .filter_map(|s| {
            s.deviation(offset_estimate).map(|frames| Deviation {
                camera: s.evidence.camera,
                frames,
            })
        })
        .collect()
}

fn exceeding(deviations: &[Deviation], tolerance: i64) -> Vec<CameraIndex> {
    deviations
        .iter()
        .filter(|d| d.frames > tolerance)
        .map(|d| d.camera)
        .collect()
}

fn missing_cameras(slots: &[Slot]) -> Vec<CameraIndex> {
    slots
        .iter()
        .filter(|s| s.evidence.optical.is_none())
        .map(|s| s.evidence.camera)
        .collect()
}

fn fill_missing(slots: &mut [Slot], offset_estimate: i64) {
    for slot in slots.iter_mut().filter(|s| s.start.is_none()) {
        slot.fill(offset_estimate);
    }
}

/// Replace the single outlier from audio.
fn correct_outlier(slots: &mut [Slot], outlier: CameraIndex, offset_estimate: i64) {
    if let Some(slot) = slots.iter_mut().find(|s| s.evidence.camera == outlier) {
        tracing::info!(
            "[Reconcile] {} optical start {:?} replaced by audio estimate {}",
            outlier,
            slot.start,
            slot.evidence.audio_start(offset_estimate)
        );
        slot.correct(offset_estimate);
    }
}

fn all_present(
    slots: &mut [Slot],
    offset_estimate: i64,
    tolerance: i64,
    report: &mut ReconcileReport,
) -> Result<(), SyncFailure> {
    let devs = deviations(slots, offset_estimate);
    let outliers = exceeding(&devs, tolerance);
    report.deviations = devs.clone();

    match outliers.as_slice() {
        [] => Ok(()),
        [outlier] => {
            correct_outlier(slots, *outlier, offset_estimate);
            Ok(())
        }
        _ => Err(SyncFailure::AmbiguousDeviation {
            cameras: outliers,
            deviations: devs,
            offset_estimate,
        }),
    }
}

fn one_missing(
    slots: &mut [Slot],
    offset_estimate: i64,
    tolerance: i64,
    report: &mut ReconcileReport,
) -> Result<(), SyncFailure> {
    let filled = missing_cameras(slots);
    fill_missing(slots, offset_estimate);

    let devs = deviations(slots, offset_estimate);
    let outliers = exceeding(&devs, tolerance);
    report.deviations = devs.clone();

    match outliers.as_slice() {
        [] => Ok(()),
        [outlier] => {
            report.warnings.push(format!(
                "one missing start and one deviation ({}); corrected from audio",
                outlier
            ));
            correct_outlier(slots, *outlier, offset_estimate);
            Ok(())
        }
        _ => Err(SyncFailure::AmbiguousAfterFill {
            filled,
            cameras: outliers,
            deviations: devs,
            offset_estimate,
        }),
    }
}

fn several_missing(
    slots: &mut [Slot],
    offset_estimate: i64,
    tolerance: i64,
    report: &mut ReconcileReport,
) -> Result<(), SyncFailure> {
    let devs = deviations(slots, offset_estimate);
    report.deviations = devs.clone();

    if devs.iter().all(|d| d.frames <= tolerance) {
        fill_missing(slots, offset_estimate);
        Ok(())
    } else {
        Err(SyncFailure::InsufficientEvidence {
            missing: missing_cameras(slots),
            valid: devs.iter().map(|d| d.camera).collect(),
            deviations: devs,
            offset_estimate,
        })
    }
}

/// Take every start from audio, then shift so the earliest is frame 1.
fn fill_and_floor(slots: &mut [Slot], offset_estimate: i64, report: &mut ReconcileReport) {
    for slot in slots.iter_mut() {
        slot.fill(offset_estimate);
    }

    let min_start = slots.iter().filter_map(|s| s.start).min().unwrap_or(1);
    if min_start < 1 {
        let shift = 1 - min_start;
        for slot in slots.iter_mut() {
            slot.start = slot.start.map(|s| s + shift);
        }
        report.shift = shift;
        tracing::debug!("[Reconcile] shifted audio starts by {}", shift);
    }
}

fn two_camera_complete(
    slots: &[Slot],
    offset_estimate: i64,
    tolerance: i64,
    report: &mut ReconcileReport,
) -> Result<(), SyncFailure> {
    let devs = deviations(slots, offset_estimate);
    let outliers = exceeding(&devs, tolerance);
    report.deviations = devs.clone();

    match outliers.first() {
        None => Ok(()),
        Some(&camera) => Err(SyncFailure::TwoCameraDeviation {
            camera,
            deviations: devs,
            offset_estimate,
        }),
    }
}

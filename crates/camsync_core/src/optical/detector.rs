//! Rising-edge detection over one camera's frame stream.

use image::RgbImage;
use thiserror::Error;

use super::hsv::frame_score;
use super::source::{FrameError, FrameSource};
use crate::models::{CameraIndex, FrameIndex, FrameNumber, LedColor, Roi};

/// Frames between progress messages.
const PROGRESS_INTERVAL: u64 = 500;

/// Per-camera detector parameters.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Brightness threshold on the 0-255 V scale. A score equal to it counts as lit.
    pub threshold: u8,
    /// Number of frames examined before giving up.
    pub horizon: u64,
    pub roi: Roi,
    pub led: LedColor,
}

/// Errors that make a camera's optical start unavailable.
///
/// None of these are fatal for the unit; the reconciler treats the camera
/// as missing and the carried trace still feeds the diagnostics.
#[derive(Error, Debug)]
pub enum OpticalError {
    #[error("{camera}: no rising edge within {horizon} frames")]
    DetectionHorizonExceeded {
        camera: CameraIndex,
        horizon: u64,
        trace: Vec<u8>,
    },

    #[error("{camera}: stream ended after {frames_scanned} frames without a rising edge")]
    StreamExhausted {
        camera: CameraIndex,
        frames_scanned: u64,
        trace: Vec<u8>,
    },

    #[error("{camera}: {source}")]
    Frame {
        camera: CameraIndex,
        #[source]
        source: FrameError,
        trace: Vec<u8>,
    },
}

impl OpticalError {
    pub fn camera(&self) -> CameraIndex {
        match self {
            OpticalError::DetectionHorizonExceeded { camera, .. }
            | OpticalError::StreamExhausted { camera, .. }
            | OpticalError::Frame { camera, .. } => *camera,
        }
    }

    /// Brightness trace collected before the failure.
    pub fn trace(&self) -> &[u8] {
        match self {
            OpticalError::DetectionHorizonExceeded { trace, .. }
            | OpticalError::StreamExhausted { trace, .. }
            | OpticalError::Frame { trace, .. } => trace,
        }
    }

    /// Convert into a "not found" detection, keeping the trace.
    pub fn into_missing(self, threshold: u8) -> OpticalDetection {
        let camera = self.camera();
        let trace = match self {
            OpticalError::DetectionHorizonExceeded { trace, .. }
            | OpticalError::StreamExhausted { trace, .. }
            | OpticalError::Frame { trace, .. } => trace,
        };
        OpticalDetection::missing(camera, trace, threshold)
    }
}

/// Outcome of scanning one camera.
#[derive(Debug, Clone)]
pub struct OpticalDetection {
    pub camera: CameraIndex,
    /// Zero-based index of the rising-edge frame.
    pub edge: Option<FrameIndex>,
    /// Score of every examined frame, in scan order.
    pub trace: Vec<u8>,
    pub threshold: u8,
    /// Copy of the rising-edge frame for the annotated diagnostic image.
    pub detection_frame: Option<RgbImage>,
}

impl OpticalDetection {
    /// A camera without an optical start.
    pub fn missing(camera: CameraIndex, trace: Vec<u8>, threshold: u8) -> Self {
        Self {
            camera,
            edge: None,
            trace,
            threshold,
            detection_frame: None,
        }
    }

    /// A start supplied by a human instead of a scan.
    pub fn manual(camera: CameraIndex, start: FrameNumber, threshold: u8) -> Self {
        let edge = (start >= 1).then(|| FrameIndex((start - 1) as u64));
        Self {
            camera,
            edge,
            trace: Vec::new(),
            threshold,
            detection_frame: None,
        }
    }

    /// One-based start frame handed to the reconciler.
    pub fn start_frame(&self) -> Option<FrameNumber> {
        self.edge.map(FrameIndex::frame_number)
    }

    pub fn is_missing(&self) -> bool {
        self.edge.is_none()
    }
}

/// Initial-active-state guard.
///
/// A stream that starts lit cannot report an edge until it has been seen
/// below threshold at least once.
#[derive(Debug, Clone)]
pub struct EdgeTracker {
    threshold: u8,
    armed: bool,
}

impl EdgeTracker {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            armed: false,
        }
    }

    /// Feed the score of frame `index`. Returns true on the rising edge.
    pub fn observe(&mut self, index: FrameIndex, score: u8) -> bool {
        let lit = score >= self.threshold;
        if index.0 == 0 && lit {
            self.armed = true;
            return false;
        }
        if !lit {
            self.armed = false;
            return false;
        }
        !self.armed
    }
}

/// Scan `source` for the first unambiguous rising edge.
///
/// Exactly `config.horizon` frames are examined. A stalled source counts
/// as exceeding the horizon.
pub fn detect_start(
    camera: CameraIndex,
    source: &mut dyn FrameSource,
    config: &DetectorConfig,
) -> Result<OpticalDetection, OpticalError> {
    tracing::info!(
        "[Optical] {} scanning {} ({} frames declared, horizon {}, threshold {}, LED {})",
        camera,
        source.name(),
        source.frame_count(),
        config.horizon,
        config.threshold,
        config.led
    );

    let mut tracker = EdgeTracker::new(config.threshold);
    let mut trace = Vec::with_capacity(config.horizon.min(source.frame_count()) as usize);

    for i in 0..config.horizon {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::warn!(
                    "[Optical] {} stream ended after {} frames without a rising edge",
                    camera,
                    i
                );
                return Err(OpticalError::StreamExhausted {
                    camera,
                    frames_scanned: i,
                    trace,
                });
            }
            Err(FrameError::Stalled {
                timeout_secs,
                frames_read,
            }) => {
                tracing::warn!(
                    "[Optical] {} frame source stalled for {}s after {} frames, treating as horizon exceeded",
                    camera,
                    timeout_secs,
                    frames_read
                );
                return Err(OpticalError::DetectionHorizonExceeded {
                    camera,
                    horizon: config.horizon,
                    trace,
                });
            }
            Err(e) => {
                tracing::warn!("[Optical] {} frame error: {}", camera, e);
                return Err(OpticalError::Frame {
                    camera,
                    source: e,
                    trace,
                });
            }
        };

        let index = FrameIndex(i);
        let score = frame_score(&frame, &config.roi, config.led);
        trace.push(score);

        if i == 0 && score >= config.threshold {
            tracing::debug!(
                "[Optical] {} LED already lit at first frame (score {}), waiting for it to go dark",
                camera,
                score
            );
        }

        if tracker.observe(index, score) {
            tracing::info!(
                "[Optical] {} rising edge at frame {} (score {})",
                camera,
                index.frame_number(),
                score
            );
            return Ok(OpticalDetection {
                camera,
                edge: Some(index),
                trace,
                threshold: config.threshold,
                detection_frame: Some(frame),
            });
        }

        if (i + 1) % PROGRESS_INTERVAL == 0 {
            tracing::debug!("[Optical] {} scanned {} frames", camera, i + 1);
        }
    }

    tracing::warn!(
        "[Optical] {} no rising edge within {} frames",
        camera,
        config.horizon
    );
    Err(OpticalError::DetectionHorizonExceeded {
        camera,
        horizon: config.horizon,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optical::source::MemoryFrameSource;
    use image::Rgb;

    const LIT: Rgb<u8> = Rgb([255, 255, 0]);
    const DARK: Rgb<u8> = Rgb([20, 20, 20]);

    fn frames(pattern: &[bool]) -> Vec<RgbImage> {
        pattern
            .iter()
            .map(|&on| RgbImage::from_pixel(8, 8, if on { LIT } else { DARK }))
            .collect()
    }

    fn config(horizon: u64) -> DetectorConfig {
        DetectorConfig {
            threshold: 175,
            horizon,
            roi: Roi::new(0, 0, 8, 8),
            led: LedColor::Yellow,
        }
    }

    fn run(pattern: &[bool], horizon: u64) -> Result<OpticalDetection, OpticalError> {
        let mut source = MemoryFrameSource::new("synthetic", frames(pattern), 119.88);
        detect_start(CameraIndex(1), &mut source, &config(horizon))
    }

    #[test]
    fn reports_first_lit_frame_after_dark_start() {
        let det = run(&[false, false, false, true, true, false], 100).unwrap();
        assert_eq!(det.edge, Some(FrameIndex(3)));
        assert_eq!(det.start_frame(), Some(4));
        assert_eq!(det.trace.len(), 4);
        assert!(det.detection_frame.is_some());
    }

    #[test]
    fn pre_lit_stream_reports_second_crossing() {
        let det = run(&[true, true, false, false, true, true], 100).unwrap();
        assert_eq!(det.edge, Some(FrameIndex(4)));
        assert_eq!(det.start_frame(), Some(5));
    }

    #[test]
    fn pre_lit_stream_that_never_goes_dark_is_missing() {
        let err = run(&[true; 20], 10).unwrap_err();
        match err {
            OpticalError::DetectionHorizonExceeded { horizon, trace, .. } => {
                assert_eq!(horizon, 10);
                assert_eq!(trace.len(), 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn horizon_failure_happens_exactly_at_horizon() {
        for horizon in [1u64, 5, 37] {
            let err = run(&vec![false; 64], horizon).unwrap_err();
            assert!(matches!(
                err,
                OpticalError::DetectionHorizonExceeded { .. }
            ));
            assert_eq!(err.trace().len() as u64, horizon);
        }
    }

    #[test]
    fn edge_at_last_frame_within_horizon_is_found() {
        let mut pattern = vec![false; 9];
        pattern.push(true);
        let det = run(&pattern, 10).unwrap();
        assert_eq!(det.start_frame(), Some(10));

        let err = run(&pattern, 9).unwrap_err();
        assert_eq!(err.trace().len(), 9);
    }

    #[test]
    fn short_stream_is_exhausted() {
        let err = run(&[false; 5], 100).unwrap_err();
        match &err {
            OpticalError::StreamExhausted { frames_scanned, .. } => assert_eq!(*frames_scanned, 5),
            other => panic!("unexpected error: {other:?}"),
        }
        let missing = err.into_missing(175);
        assert!(missing.is_missing());
        assert_eq!(missing.trace.len(), 5);
    }

    #[test]
    fn wrong_colour_is_never_lit() {
        let green = vec![RgbImage::from_pixel(4, 4, Rgb([0, 255, 0])); 10];
        let mut source = MemoryFrameSource::new("green", green, 119.88);
        let err = detect_start(CameraIndex(2), &mut source, &config(10)).unwrap_err();
        assert!(err.trace().iter().all(|&s| s == 0));
    }

    #[test]
    fn tracker_counts_threshold_as_lit() {
        let mut tracker = EdgeTracker::new(175);
        assert!(!tracker.observe(FrameIndex(0), 175));
        assert!(!tracker.observe(FrameIndex(1), 175));
        assert!(!tracker.observe(FrameIndex(2), 174));
        assert!(tracker.observe(FrameIndex(3), 175));
    }

    #[test]
    fn manual_start_round_trips_frame_number() {
        let det = OpticalDetection::manual(CameraIndex(3), 42, 175);
        assert_eq!(det.start_frame(), Some(42));
        assert!(OpticalDetection::manual(CameraIndex(3), 0, 175).is_missing());
    }
}

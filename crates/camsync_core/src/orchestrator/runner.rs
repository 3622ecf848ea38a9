//! Running one synchronization unit end to end.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::audio::{align_unit, AudioData, AudioParams, AudioResult};
use crate::config::Settings;
use crate::diagnostics::DiagnosticsWriter;
use crate::export::{
    plan_export, ExportError, ExportPlan, SyncPlanRecord, TranscodeOptions, Transcoder,
};
use crate::logging::{sanitize_filename, LogConfig, UnitLogger};
use crate::models::{CameraStream, UnitKind};
use crate::optical::{detect_start, DetectorConfig, OpticalDetection};
use crate::reconcile::{reconcile_with_report, ReconcileReport, ReconciledStart, SyncOutcome};

use super::backend::MediaBackend;
use super::errors::UnitError;
use super::unit::SyncUnit;

/// Empty file marking a unit whose outputs are complete.
pub const SYNCED_MARKER: &str = ".synced";

/// Folder layout and output behaviour shared by every unit of a batch.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_root: PathBuf,
    pub diagnostics_root: PathBuf,
    pub logs_dir: PathBuf,
    pub write_diagnostics: bool,
    pub waveform_plot_secs: f64,
    pub ffmpeg: String,
    pub transcode: TranscodeOptions,
    pub dry_run: bool,
    /// Re-run units that already have a sync plan.
    pub force: bool,
    pub log_config: LogConfig,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_root: PathBuf::from(&settings.paths.output_folder),
            diagnostics_root: PathBuf::from(&settings.paths.diagnostics_folder),
            logs_dir: PathBuf::from(&settings.paths.logs_folder),
            write_diagnostics: settings.detection.write_diagnostics,
            waveform_plot_secs: settings.audio.waveform_plot_secs,
            ffmpeg: settings.paths.ffmpeg.clone(),
            transcode: TranscodeOptions::from(&settings.export),
            dry_run: settings.export.dry_run,
            force: false,
            log_config: LogConfig::from(&settings.logging),
        }
    }

    pub fn unit_output_dir(&self, unit: &str) -> PathBuf {
        self.output_root.join(sanitize_filename(unit))
    }

    pub fn unit_diagnostics_dir(&self, unit: &str) -> PathBuf {
        self.diagnostics_root.join(sanitize_filename(unit))
    }

    /// Whether a previous run finished transcoding this unit.
    pub fn already_synchronized(&self, unit: &str) -> bool {
        self.unit_output_dir(unit).join(SYNCED_MARKER).exists()
    }
}

/// Everything a successful unit produced.
#[derive(Debug, Clone)]
pub struct UnitOutput {
    pub unit: String,
    pub starts: Vec<ReconciledStart>,
    pub plan: ExportPlan,
    pub report: ReconcileReport,
    pub plan_path: PathBuf,
}

/// Detect, align, reconcile, plan and transcode one unit.
pub fn run_unit(
    unit: &SyncUnit,
    backend: &dyn MediaBackend,
    options: &RunOptions,
    logger: &UnitLogger,
) -> Result<UnitOutput, UnitError> {
    let params = &unit.params;
    logger.phase(&format!("Synchronizing {} ({} cameras)", unit.name, unit.streams.len()));
    logger.info(&format!(
        "threshold {}, tolerance {}, horizon {} frames, audio {:.1}s from {:.1}s",
        params.threshold,
        params.tolerance,
        params.search_horizon,
        params.excerpt_secs,
        params.excerpt_start_secs
    ));
    if unit.kind == UnitKind::Calibration {
        logger.info("Calibration unit: optical detection skipped, audio only");
    }

    // Optical scan and audio extraction per camera, in parallel across cameras.
    let gathered: Vec<(OpticalDetection, AudioResult<AudioData>)> = unit
        .streams
        .par_iter()
        .map(|stream| {
            let optical = optical_for(unit, stream, backend);
            let audio = backend.audio_excerpt(
                stream,
                params.excerpt_start_secs,
                params.excerpt_secs,
                params.sample_rate,
            );
            (optical, audio)
        })
        .collect();

    let mut detections = Vec::with_capacity(gathered.len());
    let mut excerpts = Vec::with_capacity(gathered.len());
    for ((detection, audio), stream) in gathered.into_iter().zip(&unit.streams) {
        let audio = audio.map_err(|source| UnitError::Audio {
            unit: unit.name.clone(),
            source,
        })?;
        match detection.start_frame() {
            Some(start) => logger.info(&format!("{} optical start {}", stream.index, start)),
            None => logger.warn(&format!("{} optical start not found", stream.index)),
        }
        excerpts.push((stream.index, audio));
        detections.push(detection);
    }

    let audio_params = AudioParams::from(params);
    let offsets = align_unit(&excerpts, &audio_params).map_err(|source| UnitError::Audio {
        unit: unit.name.clone(),
        source,
    })?;
    for offset in &offsets {
        logger.info(&format!("{} audio offset {} frames", offset.camera, offset.frames));
    }

    if options.write_diagnostics {
        let writer = DiagnosticsWriter::new(options.unit_diagnostics_dir(&unit.name), &unit.name);
        for (stream, detection) in unit.streams.iter().zip(&detections) {
            if !detection.trace.is_empty() {
                writer.write_optical(stream, detection);
            }
        }
        let tracks: Vec<_> = excerpts.iter().map(|(c, a)| (*c, a)).collect();
        writer.write_waveforms(&tracks, &offsets, options.waveform_plot_secs);
    }

    logger.section("Reconciling");
    let (outcome, report) = reconcile_with_report(&detections, &offsets, params.tolerance);
    log_report(logger, &report);

    let starts = match outcome {
        SyncOutcome::Synced(starts) => starts,
        SyncOutcome::Failed(failure) => {
            logger.error(&failure.to_string());
            return Err(UnitError::Sync {
                unit: unit.name.clone(),
                source: failure,
            });
        }
    };
    for start in &starts {
        logger.info(&format!("{} start {} ({})", start.camera, start.start, start.status));
    }

    let output_dir = options.unit_output_dir(&unit.name);
    let plan = plan_export(&starts, &unit.streams, &output_dir).map_err(|e| export_error(unit, e))?;
    logger.info(&format!("Output length {} frames", plan.output_frames));

    let record = SyncPlanRecord::new(
        &unit.name,
        unit.kind,
        params,
        &plan,
        &detections,
        &offsets,
        &report,
    );

    let transcoder = Transcoder::new(&options.ffmpeg, options.transcode.clone(), options.dry_run);
    transcoder.run(&plan, logger).map_err(|e| export_error(unit, e))?;

    let plan_path = record.write(&output_dir).map_err(|e| export_error(unit, e))?;
    logger.info(&format!("Plan written to {}", plan_path.display()));

    // Written last so an interrupted transcode is retried on the next run.
    if !options.dry_run {
        std::fs::write(output_dir.join(SYNCED_MARKER), "")
            .map_err(|e| export_error(unit, ExportError::io("writing completion marker", e)))?;
    }

    logger.success(&format!("{} synchronized", unit.name));
    Ok(UnitOutput {
        unit: unit.name.clone(),
        starts,
        plan,
        report,
        plan_path,
    })
}

fn export_error(unit: &SyncUnit, source: ExportError) -> UnitError {
    UnitError::Export {
        unit: unit.name.clone(),
        source,
    }
}

/// Optical evidence for one camera, never failing the unit.
fn optical_for(unit: &SyncUnit, stream: &CameraStream, backend: &dyn MediaBackend) -> OpticalDetection {
    let threshold = unit.params.threshold;

    if unit.kind == UnitKind::Calibration {
        return OpticalDetection::missing(stream.index, Vec::new(), threshold);
    }
    if let Some(start) = stream.known_start {
        tracing::info!("[Optical] {} using known start {}", stream.index, start);
        return OpticalDetection::manual(stream.index, start, threshold);
    }

    let config = DetectorConfig {
        threshold,
        horizon: unit.params.search_horizon,
        roi: stream.roi,
        led: stream.led,
    };

    let mut source = match backend.open_frames(stream, config.horizon) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("[Optical] {} could not be opened: {}", stream.index, e);
            return OpticalDetection::missing(stream.index, Vec::new(), threshold);
        }
    };

    match detect_start(stream.index, source.as_mut(), &config) {
        Ok(detection) => detection,
        Err(e) => e.into_missing(threshold),
    }
}

fn log_report(logger: &UnitLogger, report: &ReconcileReport) {
    if let Some(state) = report.state {
        logger.info(&format!("State: {}", state));
    }
    let residuals: Vec<String> = report
        .residuals
        .iter()
        .map(|(camera, r)| format!("{}={}", camera, r))
        .collect();
    logger.info(&format!(
        "Residuals [{}], offset estimate {}",
        residuals.join(", "),
        report.offset_estimate
    ));
    if report.shift != 0 {
        logger.info(&format!("Starts shifted by {}", report.shift));
    }
    for warning in &report.warnings {
        logger.warn(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitConfig;
    use crate::export::SYNC_PLAN_FILE;
    use crate::models::CameraIndex;
    use crate::orchestrator::testing::{options_in, settings, write_unit_file, FakeBackend};
    use crate::reconcile::{FailureKind, StartStatus};
    use tempfile::tempdir;

    fn prepare(dir: &std::path::Path, name: &str, stems: &[&str], backend: &FakeBackend) -> SyncUnit {
        let path = write_unit_file(dir, name, stems);
        let config = UnitConfig::load(&path).unwrap();
        SyncUnit::prepare(&config, &settings(), backend).unwrap()
    }

    fn logger(dir: &std::path::Path, name: &str) -> UnitLogger {
        UnitLogger::new(name, dir.join("logs"), LogConfig::default(), None).unwrap()
    }

    #[test]
    fn four_camera_unit_corrects_outlier() {
        crate::logging::init_test_tracing();
        let dir = tempdir().unwrap();
        let backend = FakeBackend::with_edges(&[
            ("c1", Some(10)),
            ("c2", Some(11)),
            ("c3", Some(12)),
            ("c4", Some(40)),
        ]);
        let unit = prepare(dir.path(), "trial", &["c1", "c2", "c3", "c4"], &backend);
        let options = options_in(dir.path());

        let output = run_unit(&unit, &backend, &options, &logger(dir.path(), "trial")).unwrap();

        let starts: Vec<_> = output.starts.iter().map(|s| (s.start, s.status)).collect();
        assert_eq!(
            starts,
            vec![
                (11, StartStatus::Ok),
                (12, StartStatus::Ok),
                (13, StartStatus::Ok),
                (13, StartStatus::CorrectedDeviation),
            ]
        );
        assert_eq!(output.plan.output_frames, 987);
        assert!(output.plan_path.ends_with(SYNC_PLAN_FILE));
        assert!(output.plan_path.exists());
        assert!(!options.already_synchronized("trial"));

        let diag = options.unit_diagnostics_dir("trial");
        assert!(diag.join("brightness_trial_cam4.json").exists());
        assert!(diag.join("detection_trial_cam1_11.jpg").exists());
        assert!(diag.join("audio_comp_trial.svg").exists());
    }

    #[test]
    fn calibration_unit_uses_audio_only() {
        let dir = tempdir().unwrap();
        // 4 hops of 128 samples at 8 kHz is 0.064s, 7.67 frames
        let backend = FakeBackend::with_edges(&[("k1", Some(3)), ("k2", Some(3))]).delay_audio("k2", 512);
        let mut unit = prepare(dir.path(), "calib", &["k1", "k2"], &backend);
        unit.kind = UnitKind::Calibration;

        let output = run_unit(&unit, &backend, &options_in(dir.path()), &logger(dir.path(), "calib")).unwrap();

        let values: Vec<_> = output.starts.iter().map(|s| s.start).collect();
        assert_eq!(values, vec![1, 9]);
        assert!(output
            .starts
            .iter()
            .all(|s| s.status == StartStatus::FilledFromAudio));
        assert_eq!(output.report.shift, 1);
    }

    #[test]
    fn known_start_skips_detection() {
        let dir = tempdir().unwrap();
        let backend = FakeBackend::with_edges(&[("m1", Some(20)), ("m2", None)]);
        let mut unit = prepare(dir.path(), "manual", &["m1", "m2"], &backend);
        unit.streams[1].known_start = Some(22);

        let output = run_unit(&unit, &backend, &options_in(dir.path()), &logger(dir.path(), "manual")).unwrap();
        let values: Vec<_> = output.starts.iter().map(|s| s.start).collect();
        assert_eq!(values, vec![21, 22]);
    }

    #[test]
    fn undetectable_cameras_fall_back_to_audio() {
        let dir = tempdir().unwrap();
        // frame 0 already lit and never dark: the guard keeps both missing
        let backend = FakeBackend::with_edges(&[("p1", Some(0)), ("p2", None), ("p3", Some(30))]);
        let unit = prepare(dir.path(), "prelit", &["p1", "p2", "p3"], &backend);

        let (outcome_starts, report) = {
            let output =
                run_unit(&unit, &backend, &options_in(dir.path()), &logger(dir.path(), "prelit")).unwrap();
            (output.starts, output.report)
        };
        assert_eq!(report.state, Some(crate::reconcile::ReconcileState::ThreeMissing));
        let values: Vec<_> = outcome_starts.iter().map(|s| s.start).collect();
        assert_eq!(values, vec![31, 31, 31]);
        assert_eq!(outcome_starts[0].camera, CameraIndex(1));
    }

    #[test]
    fn two_camera_disagreement_is_terminal() {
        let dir = tempdir().unwrap();
        let backend = FakeBackend::with_edges(&[("x1", Some(5)), ("x2", Some(45))]);
        let unit = prepare(dir.path(), "split", &["x1", "x2"], &backend);

        let err = run_unit(&unit, &backend, &options_in(dir.path()), &logger(dir.path(), "split")).unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::AmbiguousDeviation));
        assert_eq!(err.unit(), "split");
        assert!(!options_in(dir.path()).unit_output_dir("split").join(SYNC_PLAN_FILE).exists());
    }
}

//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use camsync_core::audio::{AudioOffset, AudioParams};
use camsync_core::config::{ConfigManager, Settings};
use camsync_core::logging::{init_tracing, LogLevel};
use camsync_core::models::{CameraIndex, FrameNumber, TranscodeProfile};
use camsync_core::optical::OpticalDetection;
use camsync_core::orchestrator::{
    run_batch, BatchSummary, FfmpegBackend, RunOptions, SharedLogCallback, UnitStatus,
};
use camsync_core::reconcile::{self as reconciler, SyncOutcome};

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub profile: Option<TranscodeProfile>,
    pub dry_run: bool,
    pub force: bool,
}

pub fn run(
    config_path: &Path,
    log_level: Option<LogLevel>,
    json: bool,
    units: &[PathBuf],
    overrides: RunOverrides,
) -> Result<ExitCode> {
    let mut manager = ConfigManager::new(config_path);
    manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    manager
        .ensure_dirs_exist()
        .context("creating output folders")?;
    let settings = manager.into_settings();

    init_tracing(log_level.unwrap_or(settings.logging.level));
    tracing::info!(
        "[CLI] camsync {} with {} unit(s)",
        camsync_core::version(),
        units.len()
    );

    let mut options = RunOptions::from_settings(&settings);
    apply_overrides(&mut options, &overrides);

    let backend = FfmpegBackend::from_settings(&settings);
    let callback: Option<SharedLogCallback> = (settings.logging.echo && !json)
        .then(|| Arc::new(|line: &str| println!("{}", line)) as SharedLogCallback);

    let summary = run_batch(units, &settings, &options, &backend, callback);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing batch summary")?
        );
    } else {
        print_summary(&summary);
    }

    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_overrides(options: &mut RunOptions, overrides: &RunOverrides) {
    if let Some(profile) = overrides.profile {
        options.transcode.profile = profile;
    }
    options.dry_run |= overrides.dry_run;
    options.force |= overrides.force;
}

fn print_summary(summary: &BatchSummary) {
    for report in &summary.reports {
        match report.status {
            UnitStatus::Synced => {
                let starts: Vec<String> = report
                    .starts
                    .iter()
                    .map(|s| format!("{}={} ({})", s.camera, s.start, s.status))
                    .collect();
                println!(
                    "{:<24} synced   {} frames  {}",
                    report.unit,
                    report.output_frames.unwrap_or(0),
                    starts.join(" ")
                );
            }
            UnitStatus::Skipped => println!("{:<24} skipped  (already synchronized)", report.unit),
            UnitStatus::Failed => println!(
                "{:<24} FAILED   {}",
                report.unit,
                report.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "\n{} synced, {} skipped, {} failed",
        summary.synced(),
        summary.skipped(),
        summary.failed()
    );
}

pub fn init_config(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ConfigManager::new(path)
        .save()
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub fn reconcile(
    config_path: &Path,
    json: bool,
    optical: &[String],
    audio: &[String],
    tolerance: Option<i64>,
) -> Result<ExitCode> {
    let settings = load_settings_if_present(config_path)?;
    let tolerance = tolerance.unwrap_or(settings.reconcile.tolerance);
    let threshold = settings.detection.threshold;

    let starts = parse_optical(optical)?;
    let offsets = parse_audio(audio)?;
    if starts.len() != offsets.len() {
        bail!(
            "{} optical starts but {} audio offsets",
            starts.len(),
            offsets.len()
        );
    }

    let params = AudioParams {
        sample_rate: settings.audio.sample_rate,
        hop_length: settings.audio.hop_length,
        frame_length: settings.audio.frame_length,
        fps: settings.audio.nominal_fps,
    };
    let detections: Vec<OpticalDetection> = starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let camera = camera_at(i);
            match start {
                Some(start) => OpticalDetection::manual(camera, *start, threshold),
                None => OpticalDetection::missing(camera, Vec::new(), threshold),
            }
        })
        .collect();
    let audio_offsets: Vec<AudioOffset> = offsets
        .iter()
        .enumerate()
        .map(|(i, frames)| AudioOffset {
            frames: *frames,
            ..AudioOffset::reference(camera_at(i), &params)
        })
        .collect();

    let outcome = reconciler::reconcile(&detections, &audio_offsets, tolerance);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serializing outcome")?
        );
    } else {
        match &outcome {
            SyncOutcome::Synced(starts) => {
                for s in starts {
                    println!("{}\t{}\t{}", s.camera, s.start, s.status);
                }
            }
            SyncOutcome::Failed(failure) => println!("failed: {}", failure),
        }
    }

    Ok(match outcome {
        SyncOutcome::Synced(_) => ExitCode::SUCCESS,
        SyncOutcome::Failed(_) => ExitCode::FAILURE,
    })
}

fn load_settings_if_present(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let mut manager = ConfigManager::new(path);
    manager
        .load()
        .with_context(|| format!("loading settings from {}", path.display()))?;
    Ok(manager.into_settings())
}

fn camera_at(position: usize) -> CameraIndex {
    CameraIndex(position as u8 + 1)
}

/// Parse optical starts; `-` (or an empty entry) marks a missing camera.
fn parse_optical(values: &[String]) -> Result<Vec<Option<FrameNumber>>> {
    values
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.trim();
            if raw.is_empty() || raw == "-" {
                return Ok(None);
            }
            let start: FrameNumber = raw
                .parse()
                .with_context(|| format!("optical start {} ('{}') is not a number", i + 1, raw))?;
            if start < 1 {
                bail!("optical start {} must be at least 1, got {}", i + 1, start);
            }
            Ok(Some(start))
        })
        .collect()
}

fn parse_audio(values: &[String]) -> Result<Vec<i64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.trim()
                .parse()
                .with_context(|| format!("audio offset {} ('{}') is not a number", i + 1, raw))
        })
        .collect()
}

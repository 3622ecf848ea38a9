//! Running many independent units.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{Settings, UnitConfig};
use crate::logging::UnitLogger;
use crate::reconcile::{FailureKind, ReconciledStart};

use super::backend::MediaBackend;
use super::errors::UnitError;
use super::runner::{run_unit, RunOptions};
use super::unit::SyncUnit;

/// Shared line sink handed to every unit logger.
pub type SharedLogCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Synced,
    Skipped,
    Failed,
}

/// Outcome of one unit within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub unit: String,
    pub source: PathBuf,
    pub status: UnitStatus,
    pub starts: Vec<ReconciledStart>,
    pub output_frames: Option<u64>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub log_path: Option<PathBuf>,
}

impl UnitReport {
    fn new(unit: String, source: &Path, status: UnitStatus) -> Self {
        Self {
            unit,
            source: source.to_path_buf(),
            status,
            starts: Vec::new(),
            output_frames: None,
            error: None,
            failure_kind: None,
            log_path: None,
        }
    }

    fn failed(unit: String, source: &Path, error: &UnitError) -> Self {
        Self {
            error: Some(error.to_string()),
            failure_kind: error.kind(),
            ..Self::new(unit, source, UnitStatus::Failed)
        }
    }
}

/// Reports of a whole batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<UnitReport>,
}

impl BatchSummary {
    fn count(&self, status: UnitStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    pub fn synced(&self) -> usize {
        self.count(UnitStatus::Synced)
    }

    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(UnitStatus::Failed)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Run every unit file in turn. A failing unit never stops the others.
pub fn run_batch(
    unit_files: &[PathBuf],
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn MediaBackend,
    callback: Option<SharedLogCallback>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (i, path) in unit_files.iter().enumerate() {
        tracing::info!(
            "[Batch] Unit {}/{}: {}",
            i + 1,
            unit_files.len(),
            path.display()
        );
        let report = run_one(path, settings, options, backend, callback.clone());
        match report.status {
            UnitStatus::Synced => tracing::info!("[Batch] {} synchronized", report.unit),
            UnitStatus::Skipped => tracing::info!("[Batch] {} already synchronized, skipped", report.unit),
            UnitStatus::Failed => tracing::error!(
                "[Batch] {} failed: {}",
                report.unit,
                report.error.as_deref().unwrap_or("unknown error")
            ),
        }
        summary.reports.push(report);
    }

    summary
}

fn run_one(
    path: &Path,
    settings: &Settings,
    options: &RunOptions,
    backend: &dyn MediaBackend,
    callback: Option<SharedLogCallback>,
) -> UnitReport {
    let fallback_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let config = match UnitConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            return UnitReport::failed(fallback_name.clone(), path, &UnitError::config(fallback_name, e))
        }
    };

    if !options.force && options.already_synchronized(&config.name) {
        return UnitReport::new(config.name, path, UnitStatus::Skipped);
    }

    let logger_callback = callback.map(|cb| -> crate::logging::LogCallback {
        Box::new(move |line: &str| cb(line))
    });
    let logger = match UnitLogger::new(
        &config.name,
        &options.logs_dir,
        options.log_config.clone(),
        logger_callback,
    ) {
        Ok(logger) => logger,
        Err(e) => {
            let error = UnitError::setup(&config.name, format!("cannot create log file: {}", e));
            return UnitReport::failed(config.name, path, &error);
        }
    };
    let log_path = Some(logger.log_path().to_path_buf());

    let result = SyncUnit::prepare(&config, settings, backend)
        .and_then(|unit| run_unit(&unit, backend, options, &logger));

    let report = match result {
        Ok(output) => UnitReport {
            starts: output.starts,
            output_frames: Some(output.plan.output_frames),
            log_path,
            ..UnitReport::new(config.name, path, UnitStatus::Synced)
        },
        Err(e) => {
            logger.error(&e.to_string());
            UnitReport {
                log_path,
                ..UnitReport::failed(config.name, path, &e)
            }
        }
    };
    logger.close();
    report
}

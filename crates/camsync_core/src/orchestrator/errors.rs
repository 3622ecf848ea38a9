//! Error types for unit runs.
//!
//! Every variant names the unit so batch summaries stay readable.

use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::models::CameraIndex;
use crate::optical::FrameError;
use crate::reconcile::{FailureKind, SyncFailure};

#[derive(Error, Debug)]
pub enum UnitError {
    #[error("Unit '{unit}' configuration error: {source}")]
    Config {
        unit: String,
        #[source]
        source: ConfigError,
    },

    #[error("Unit '{unit}' could not probe {camera}: {source}")]
    Probe {
        unit: String,
        camera: CameraIndex,
        #[source]
        source: FrameError,
    },

    #[error("Unit '{unit}' audio alignment failed: {source}")]
    Audio {
        unit: String,
        #[source]
        source: AudioError,
    },

    #[error("Unit '{unit}' could not be synchronized: {source}")]
    Sync {
        unit: String,
        #[source]
        source: SyncFailure,
    },

    #[error("Unit '{unit}' export failed: {source}")]
    Export {
        unit: String,
        #[source]
        source: ExportError,
    },

    #[error("Unit '{unit}' setup failed: {message}")]
    Setup { unit: String, message: String },
}

impl UnitError {
    pub fn config(unit: impl Into<String>, source: ConfigError) -> Self {
        Self::Config {
            unit: unit.into(),
            source,
        }
    }

    pub fn setup(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            unit: unit.into(),
            message: message.into(),
        }
    }

    pub fn unit(&self) -> &str {
        match self {
            UnitError::Config { unit, .. }
            | UnitError::Probe { unit, .. }
            | UnitError::Audio { unit, .. }
            | UnitError::Sync { unit, .. }
            | UnitError::Export { unit, .. }
            | UnitError::Setup { unit, .. } => unit,
        }
    }

    /// Failure category, when the error is one of the terminal classifications.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            UnitError::Sync { source, .. } => Some(source.kind()),
            UnitError::Export { source, .. } => source.kind(),
            _ => None,
        }
    }
}

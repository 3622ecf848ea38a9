//! Decision states of the reconciler.

use serde::{Deserialize, Serialize};

/// Which branch of the decision procedure a unit falls into.
///
/// Determined only by the number of configured cameras and how many of
/// them lack an optical start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileState {
    /// Every camera has an optical start.
    AllPresent,
    /// Exactly one camera is missing.
    OneMissing,
    /// Several cameras are missing, at least two are valid.
    TwoMissing,
    /// A single camera is valid.
    ThreeMissing,
    /// No camera has an optical start.
    AllMissing,
    /// Two cameras, at least one missing.
    TwoCameraPartial,
    /// Two cameras, both present.
    TwoCameraComplete,
}

impl ReconcileState {
    /// Classify a unit of `cameras` cameras with `missing` optical failures.
    ///
    /// Returns `None` for fewer than two cameras or an impossible count.
    pub fn classify(cameras: usize, missing: usize) -> Option<Self> {
        if cameras < 2 || missing > cameras {
            return None;
        }
        if cameras == 2 {
            return Some(if missing == 0 {
                ReconcileState::TwoCameraComplete
            } else {
                ReconcileState::TwoCameraPartial
            });
        }
        Some(match missing {
            0 => ReconcileState::AllPresent,
            k if k == cameras => ReconcileState::AllMissing,
            k if k == cameras - 1 => ReconcileState::ThreeMissing,
            1 => ReconcileState::OneMissing,
            _ => ReconcileState::TwoMissing,
        })
    }

    /// Whether the outcome rests on less cross-checking than usual.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            ReconcileState::ThreeMissing
                | ReconcileState::AllMissing
                | ReconcileState::TwoCameraPartial
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReconcileState::AllPresent => "all-present",
            ReconcileState::OneMissing => "one-missing",
            ReconcileState::TwoMissing => "two-missing",
            ReconcileState::ThreeMissing => "three-missing",
            ReconcileState::AllMissing => "all-missing",
            ReconcileState::TwoCameraPartial => "two-camera-partial",
            ReconcileState::TwoCameraComplete => "two-camera-complete",
        }
    }
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

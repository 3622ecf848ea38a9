//! Reconciliation of optical and audio evidence.
//!
//! Each camera's residual is its optical start minus its audio offset. The
//! median residual says where the audio places the reference camera, so
//! `offset_estimate + audio_offset` is every camera's audio-derived start.
//! The unit's [`ReconcileState`] decides which cameras are trusted, filled
//! or corrected, and when the evidence is too contradictory to continue.

mod reconciler;
mod state;
mod types;

pub use reconciler::{median_residual, reconcile, reconcile_with_report};
pub use state::ReconcileState;
pub use types::{
    Deviation, FailureKind, ReconcileReport, ReconciledStart, StartStatus, SyncFailure,
    SyncOutcome,
};

//! Unit orchestration.
//!
//! A unit runs in four stages with a join between the second and third:
//!
//! 1. **Prepare**: validate the unit file and probe each camera.
//! 2. **Gather**: optical detection and audio extraction for every
//!    camera, in parallel across cameras.
//! 3. **Decide**: align audio against the first camera, write diagnostics
//!    and reconcile.
//! 4. **Export**: plan the trim, run the transcoder and write
//!    `sync_plan.json`.
//!
//! Units share no mutable state, so a failing unit never affects another.

mod backend;
mod batch;
mod errors;
mod runner;
#[cfg(test)]
mod testing;
mod unit;

pub use backend::{FfmpegBackend, MediaBackend};
pub use batch::{run_batch, BatchSummary, SharedLogCallback, UnitReport, UnitStatus};
pub use errors::UnitError;
pub use runner::{run_unit, RunOptions, UnitOutput, SYNCED_MARKER};
pub use unit::SyncUnit;

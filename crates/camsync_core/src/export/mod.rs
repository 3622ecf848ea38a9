//! Export planning and transcoding.
//!
//! The planner turns reconciled starts into a shared output length and a
//! seek per camera. The transcoder hands each camera to FFmpeg with the
//! selected encoder profile.

mod plan;
mod plan_file;
mod transcode;

pub use plan::{plan_export, CameraExport, ExportError, ExportPlan};
pub use plan_file::{CameraRecord, SyncPlanRecord, SYNC_PLAN_FILE};
pub use transcode::{build_transcode_args, TranscodeOptions, Transcoder};

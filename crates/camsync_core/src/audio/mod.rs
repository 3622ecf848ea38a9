//! Audio alignment between cameras.
//!
//! The pipeline is a handful of pure functions:
//!
//! 1. **Extraction** (`extract`): decode a mono excerpt with FFmpeg.
//! 2. **Envelope** (`envelope`): centered RMS energy per hop.
//! 3. **Correlation** (`correlation`): FFT full-mode cross-correlation of
//!    the target envelope against the reference envelope.
//! 4. **Alignment** (`align`): peak lag to seconds to rounded frames,
//!    with the first camera as the zero-offset anchor.
//!
//! The result is a cross-check for the optical starts, not primary truth.

mod align;
mod correlation;
mod envelope;
mod extract;
mod types;

pub use align::{align_unit, estimate_offset};
pub use correlation::{best_lag, cross_correlate};
pub use envelope::rms_envelope;
pub use extract::extract_excerpt;
pub use types::{AudioData, AudioError, AudioOffset, AudioParams, AudioResult};

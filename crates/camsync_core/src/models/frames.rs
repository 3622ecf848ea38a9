//! Frame numbering.
//!
//! Scanning works on zero-based [`FrameIndex`] values. Everything past the
//! optical detector (reconciler, export planner, transcoder, diagnostics
//! file names) works on one-based [`FrameNumber`] values. The only place the
//! two are converted is [`FrameIndex::frame_number`].

use serde::{Deserialize, Serialize};

/// One-based, signed start frame as reported to the reconciler.
///
/// Signed because audio-derived fills can temporarily land before the
/// stream start; the reconciler and planner decide what to do with those.
pub type FrameNumber = i64;

/// Zero-based position of a frame within a scanned stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Convert to the externally reported one-based frame number.
    pub fn frame_number(self) -> FrameNumber {
        self.0 as FrameNumber + 1
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_number_is_one_based() {
        assert_eq!(FrameIndex(0).frame_number(), 1);
        assert_eq!(FrameIndex(119).frame_number(), 120);
    }
}

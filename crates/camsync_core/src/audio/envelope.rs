//! RMS energy envelope.

/// Root-mean-square energy over centered windows.
///
/// The signal is zero padded by `frame_length / 2` on both sides and one
/// value is produced every `hop_length` samples, giving
/// `1 + len / hop_length` values.
pub fn rms_envelope(samples: &[f64], frame_length: usize, hop_length: usize) -> Vec<f64> {
    if samples.is_empty() || frame_length == 0 || hop_length == 0 {
        return Vec::new();
    }

    let pad = frame_length / 2;
    let frames = 1 + samples.len() / hop_length;

    // squares[i] covers padded position i
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &s in samples {
        acc += s * s;
        prefix.push(acc);
    }

    let energy_between = |start: isize, end: isize| -> f64 {
        let lo = start.clamp(0, samples.len() as isize) as usize;
        let hi = end.clamp(0, samples.len() as isize) as usize;
        if hi <= lo {
            0.0
        } else {
            prefix[hi] - prefix[lo]
        }
    };

    (0..frames)
        .map(|t| {
            let start = (t * hop_length) as isize - pad as isize;
            let end = start + frame_length as isize;
            let energy = energy_between(start, end).max(0.0);
            (energy / frame_length as f64).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_follows_centered_convention() {
        let samples = vec![0.0; 48000];
        assert_eq!(rms_envelope(&samples, 2048, 128).len(), 1 + 48000 / 128);
        assert_eq!(rms_envelope(&[1.0; 100], 16, 8).len(), 13);
    }

    #[test]
    fn constant_signal_has_unit_rms_away_from_edges() {
        let env = rms_envelope(&vec![1.0; 1000], 64, 16);
        assert!((env[10] - 1.0).abs() < 1e-12);
        // first window is half padding
        assert!((env[0] - (0.5f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_envelope() {
        assert!(rms_envelope(&[], 2048, 128).is_empty());
    }
}

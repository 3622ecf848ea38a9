//! FFT-based full-mode cross-correlation.

use rustfft::{num_complex::Complex, FftPlanner};

/// Full cross-correlation of `target` against `reference`.
///
/// Output index `j` holds `sum_n target[n + k] * reference[n]` for lag
/// `k = j - (reference.len() - 1)`, so the output has
/// `target.len() + reference.len() - 1` values.
pub fn cross_correlate(target: &[f64], reference: &[f64]) -> Vec<f64> {
    if target.is_empty() || reference.is_empty() {
        return Vec::new();
    }

    let full_len = target.len() + reference.len() - 1;
    let fft_len = full_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut target_spec: Vec<Complex<f64>> =
        target.iter().map(|&x| Complex::new(x, 0.0)).collect();
    target_spec.resize(fft_len, Complex::new(0.0, 0.0));

    let mut reference_spec: Vec<Complex<f64>> =
        reference.iter().map(|&x| Complex::new(x, 0.0)).collect();
    reference_spec.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut target_spec);
    fft.process(&mut reference_spec);

    let mut product: Vec<Complex<f64>> = target_spec
        .iter()
        .zip(reference_spec.iter())
        .map(|(a, b)| a * b.conj())
        .collect();

    ifft.process(&mut product);

    // Circular index of lag k is k mod fft_len; negative lags wrap to the end.
    let scale = 1.0 / fft_len as f64;
    let shift = reference.len() - 1;
    (0..full_len)
        .map(|j| {
            let circ = (j + fft_len - shift) % fft_len;
            product[circ].re * scale
        })
        .collect()
}

/// Lag of maximum correlation in `target` relative to `reference`.
///
/// Positive means the reference content appears later in the target.
/// The first maximum wins on ties.
pub fn best_lag(target: &[f64], reference: &[f64]) -> Option<i64> {
    let correlation = cross_correlate(target, reference);
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in correlation.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i as i64 - (reference.len() as i64 - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(target: &[f64], reference: &[f64]) -> Vec<f64> {
        let m = reference.len() as i64;
        let n = target.len() as i64;
        (-(m - 1)..n)
            .map(|k| {
                (0..m)
                    .filter_map(|i| {
                        let t = i + k;
                        (t >= 0 && t < n).then(|| target[t as usize] * reference[i as usize])
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn matches_direct_correlation() {
        let target = [0.0, 1.0, 3.0, -2.0, 0.5];
        let reference = [2.0, -1.0, 0.25];
        let fast = cross_correlate(&target, &reference);
        let slow = direct(&target, &reference);
        assert_eq!(fast.len(), slow.len());
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn pulse_shift_is_recovered() {
        let mut reference = vec![0.0; 64];
        reference[10] = 1.0;
        let mut target = vec![0.0; 64];
        target[17] = 1.0;
        assert_eq!(best_lag(&target, &reference), Some(7));
        assert_eq!(best_lag(&reference, &target), Some(-7));
    }

    #[test]
    fn empty_input_has_no_lag() {
        assert_eq!(best_lag(&[], &[1.0]), None);
    }
}

//! Offset estimation between camera audio tracks.

use super::correlation::best_lag;
use super::envelope::rms_envelope;
use super::types::{AudioData, AudioError, AudioOffset, AudioParams, AudioResult};
use crate::models::CameraIndex;

/// Estimate how many frames later the shared sound appears in `target`
/// than in `reference`.
pub fn estimate_offset(
    camera: CameraIndex,
    reference: &AudioData,
    target: &AudioData,
    params: &AudioParams,
) -> AudioResult<AudioOffset> {
    if params.hop_length == 0 || params.frame_length == 0 {
        return Err(AudioError::InvalidParams(
            "hop_length and frame_length must be positive".to_string(),
        ));
    }
    if !(params.fps.is_finite() && params.fps > 0.0) {
        return Err(AudioError::InvalidParams(format!(
            "nominal fps {} is not positive",
            params.fps
        )));
    }
    if reference.sample_rate != target.sample_rate {
        return Err(AudioError::SampleRateMismatch {
            camera,
            reference: reference.sample_rate,
            target: target.sample_rate,
        });
    }
    if target.is_empty() {
        return Err(AudioError::Empty(camera));
    }

    let reference_env = rms_envelope(&reference.samples, params.frame_length, params.hop_length);
    let target_env = rms_envelope(&target.samples, params.frame_length, params.hop_length);

    let lag_hops = best_lag(&target_env, &reference_env).ok_or(AudioError::Empty(camera))?;
    let seconds = lag_hops as f64 * params.hop_length as f64 / target.sample_rate as f64;
    let frames = seconds_to_frames(seconds, params.fps);

    tracing::debug!(
        "[Audio] {} lag {} hops = {:.4}s = {} frames",
        camera,
        lag_hops,
        seconds,
        frames
    );

    Ok(AudioOffset {
        camera,
        frames,
        lag_hops,
        seconds,
        sample_rate: target.sample_rate,
        hop_length: params.hop_length,
        fps: params.fps,
    })
}

/// Nearest whole frame, ties to even.
pub(crate) fn seconds_to_frames(seconds: f64, fps: f64) -> i64 {
    (seconds * fps).round_ties_even() as i64
}

/// Align every excerpt against the first one, which becomes the reference.
///
/// Offsets come back in input order.
pub fn align_unit(
    excerpts: &[(CameraIndex, AudioData)],
    params: &AudioParams,
) -> AudioResult<Vec<AudioOffset>> {
    let ((reference_camera, reference), rest) =
        excerpts.split_first().ok_or(AudioError::NoExcerpts)?;

    if reference.is_empty() {
        return Err(AudioError::Empty(*reference_camera));
    }

    tracing::info!(
        "[Audio] Aligning {} tracks against {} ({:.1}s excerpts)",
        excerpts.len(),
        reference_camera,
        reference.duration_secs()
    );

    let mut offsets = Vec::with_capacity(excerpts.len());
    offsets.push(AudioOffset::reference(*reference_camera, params));
    for (camera, audio) in rest {
        let offset = estimate_offset(*camera, reference, audio, params)?;
        tracing::info!("[Audio] {} offset {} frames", camera, offset.frames);
        offsets.push(offset);
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rounding_ties_go_to_even() {
        assert_eq!(seconds_to_frames(0.5, 1.0), 0);
        assert_eq!(seconds_to_frames(1.5, 1.0), 2);
        assert_eq!(seconds_to_frames(2.5, 1.0), 2);
        assert_eq!(seconds_to_frames(-2.5, 1.0), -2);
        assert_eq!(seconds_to_frames(2.6, 1.0), 3);
    }

    const RATE: u32 = 48000;

    /// Three tone bursts at irregular spacing.
    fn bursts(len: usize) -> Vec<f64> {
        let mut samples = vec![0.0; len];
        for (start_secs, burst_len, amp) in [(0.4, 1500, 0.8), (1.1, 3000, 0.5), (2.0, 900, 1.0)] {
            let start = (start_secs * RATE as f64) as usize;
            for i in 0..burst_len {
                let t = i as f64 / RATE as f64;
                samples[start + i] = amp * (2.0 * std::f64::consts::PI * 440.0 * t).sin();
            }
        }
        samples
    }

    fn delayed(samples: &[f64], shift: usize) -> Vec<f64> {
        let mut out = vec![0.0; shift];
        out.extend_from_slice(&samples[..samples.len() - shift]);
        out
    }

    fn params() -> AudioParams {
        AudioParams {
            sample_rate: RATE,
            ..AudioParams::default()
        }
    }

    #[test]
    fn known_delay_is_recovered() {
        let reference = AudioData::new(bursts(3 * RATE as usize), RATE);
        // 94 hops of 128 samples, 0.2507s
        let target = AudioData::new(delayed(&reference.samples, 94 * 128), RATE);

        let offset = estimate_offset(CameraIndex(2), &reference, &target, &params()).unwrap();
        assert_eq!(offset.lag_hops, 94);
        assert_eq!(offset.frames, 30);
    }

    #[test]
    fn swapping_reference_and_target_flips_sign() {
        let a = AudioData::new(bursts(3 * RATE as usize), RATE);
        let b = AudioData::new(delayed(&a.samples, 5000), RATE);

        let ab = estimate_offset(CameraIndex(2), &a, &b, &params()).unwrap();
        let ba = estimate_offset(CameraIndex(1), &b, &a, &params()).unwrap();
        assert_eq!(ab.lag_hops, -ba.lag_hops);
        assert!((ab.frames + ba.frames).abs() <= 1);
    }

    #[test]
    fn reference_camera_is_zero() {
        let a = AudioData::new(bursts(3 * RATE as usize), RATE);
        let b = AudioData::new(delayed(&a.samples, 94 * 128), RATE);
        let offsets = align_unit(
            &[(CameraIndex(1), a.clone()), (CameraIndex(2), b), (CameraIndex(3), a)],
            &params(),
        )
        .unwrap();
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0].frames, 0);
        assert_eq!(offsets[0].camera, CameraIndex(1));
        assert_eq!(offsets[1].frames, 30);
        assert_eq!(offsets[2].frames, 0);
    }

    #[test]
    fn mismatched_rates_are_rejected() {
        let a = AudioData::new(vec![0.1; 1000], 48000);
        let b = AudioData::new(vec![0.1; 1000], 44100);
        let err = estimate_offset(CameraIndex(2), &a, &b, &params()).unwrap_err();
        assert!(matches!(err, AudioError::SampleRateMismatch { .. }));
    }

    #[test]
    fn empty_target_is_rejected() {
        let a = AudioData::new(vec![0.1; 1000], RATE);
        let b = AudioData::new(Vec::new(), RATE);
        assert!(matches!(
            estimate_offset(CameraIndex(4), &a, &b, &params()),
            Err(AudioError::Empty(CameraIndex(4)))
        ));
        assert!(matches!(align_unit(&[], &params()), Err(AudioError::NoExcerpts)));
    }
}

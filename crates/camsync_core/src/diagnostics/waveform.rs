//! Audio waveform comparison plot.

use super::svg::{self, Panel};
use crate::audio::{AudioData, AudioOffset};
use crate::models::CameraIndex;

const POINTS: usize = 2000;

/// Samples of `audio` aligned to the earliest camera, `duration_secs` long.
///
/// A camera whose offset is larger started recording earlier relative to
/// the sound, so its excerpt is advanced by the difference.
pub fn aligned_window(
    audio: &AudioData,
    offset_frames: i64,
    min_offset_frames: i64,
    fps: f64,
    duration_secs: f64,
) -> Vec<f64> {
    let max_len = (duration_secs * audio.sample_rate as f64) as usize;
    let start = (((offset_frames - min_offset_frames) as f64 / fps) * audio.sample_rate as f64) as usize;
    let end = (start + max_len).min(audio.samples.len());
    if start >= end {
        return Vec::new();
    }
    audio.samples[start..end].to_vec()
}

/// One row per camera, each shifted by its audio offset.
pub fn render_waveforms(
    unit: &str,
    tracks: &[(CameraIndex, &AudioData)],
    offsets: &[AudioOffset],
    duration_secs: f64,
) -> String {
    let min_offset = offsets.iter().map(|o| o.frames).min().unwrap_or(0);

    let rows: Vec<(String, Vec<f64>)> = tracks
        .iter()
        .filter_map(|(camera, audio)| {
            let offset = offsets.iter().find(|o| o.camera == *camera)?;
            let window = aligned_window(audio, offset.frames, min_offset, offset.fps, duration_secs);
            let title = format!(
                "{} offset {} frames ({:.3}s)",
                camera,
                offset.frames,
                offset.frames as f64 / offset.fps
            );
            Some((title, svg::decimate(&window, POINTS)))
        })
        .collect();

    let peak = rows
        .iter()
        .flat_map(|(_, v)| v.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(1e-6);

    let panels: Vec<Panel<'_>> = rows
        .iter()
        .map(|(title, values)| Panel {
            title: title.clone(),
            values,
            y_range: (-peak, peak),
            color: "steelblue",
            hline: None,
            vline: None,
        })
        .collect();

    svg::render(&format!("{} synced audio waveforms", unit), &panels, 120.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioParams;

    #[test]
    fn window_is_advanced_by_relative_offset() {
        let audio = AudioData::new((0..1000).map(|i| i as f64).collect(), 100);
        // 2 frames at 10 fps = 0.2 s = 20 samples
        let window = aligned_window(&audio, 5, 3, 10.0, 1.0);
        assert_eq!(window.len(), 100);
        assert_eq!(window[0], 20.0);
    }

    #[test]
    fn renders_one_row_per_camera() {
        let a = AudioData::new(vec![0.1; 480], 48000);
        let b = AudioData::new(vec![-0.2; 480], 48000);
        let params = AudioParams::default();
        let offsets = vec![
            AudioOffset::reference(CameraIndex(1), &params),
            AudioOffset {
                frames: -1,
                ..AudioOffset::reference(CameraIndex(2), &params)
            },
        ];
        let svg = render_waveforms(
            "unit",
            &[(CameraIndex(1), &a), (CameraIndex(2), &b)],
            &offsets,
            0.01,
        );
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("cam2 offset -1 frames"));
    }
}

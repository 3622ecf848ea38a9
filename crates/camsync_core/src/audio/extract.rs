//! Audio excerpts decoded by FFmpeg as mono little-endian f64.

use std::path::Path;
use std::process::{Command, Stdio};

use super::types::{AudioData, AudioError, AudioResult};

const SAMPLE_BYTES: usize = 8;

fn excerpt_args(input: &Path, start_secs: f64, duration_secs: f64, sample_rate: u32) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-ss".into(),
        format!("{:.3}", start_secs),
        "-i".into(),
        input.display().to_string(),
        "-t".into(),
        format!("{:.3}", duration_secs),
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-f".into(),
        "f64le".into(),
        "pipe:1".into(),
    ]
}

/// Decode `duration_secs` of audio from `start_secs` in `input`.
pub fn extract_excerpt(
    ffmpeg: &str,
    input: &Path,
    start_secs: f64,
    duration_secs: f64,
    sample_rate: u32,
) -> AudioResult<AudioData> {
    if !input.exists() {
        return Err(AudioError::SourceNotFound(input.display().to_string()));
    }

    let args = excerpt_args(input, start_secs, duration_secs, sample_rate);
    tracing::debug!("[Audio] {} {}", ffmpeg, args.join(" "));

    let output = Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AudioError::FfmpegError(format!("cannot start {}: {}", ffmpeg, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("no output");
        return Err(AudioError::FfmpegError(format!(
            "{} (exit {:?}) on {}",
            last.trim(),
            output.status.code(),
            input.display()
        )));
    }

    let samples = decode_f64le(&output.stdout);
    tracing::debug!(
        "[Audio] {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / sample_rate.max(1) as f64,
        input.display()
    );
    Ok(AudioData::new(samples, sample_rate))
}

/// Little-endian f64 samples; a trailing partial sample is dropped.
fn decode_f64le(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; SAMPLE_BYTES];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_samples_and_drops_partial_tail() {
        let mut bytes = Vec::new();
        for v in [0.5f64, -1.0, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(0xff);
        assert_eq!(decode_f64le(&bytes), vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn args_seek_before_input_and_request_mono() {
        let args = excerpt_args(Path::new("cam1.mp4"), 30.0, 12.5, 48000);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "30.000");
        assert_eq!(args[input + 1], "cam1.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "12.500"));
        assert!(args.windows(2).any(|w| w[0] == "-ac" && w[1] == "1"));
        assert!(args.windows(2).any(|w| w[0] == "-ar" && w[1] == "48000"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = extract_excerpt("ffmpeg", Path::new("/nonexistent.mp4"), 0.0, 30.0, 48000);
        assert!(matches!(result, Err(AudioError::SourceNotFound(_))));
    }
}

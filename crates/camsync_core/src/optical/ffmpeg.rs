//! FFmpeg subprocess-based frame source and FFprobe stream probing.
//!
//! Frames are decoded by an external `ffmpeg` process writing raw RGB24 to
//! its stdout. A reader thread slices the pipe into frames and hands them
//! over a bounded channel, so a decoder that stops producing output is
//! noticed after the configured timeout instead of blocking the scan.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::RgbImage;
use serde_json::Value;

use super::source::{FrameError, FrameSource};
use crate::models::VideoInfo;

/// Options for [`FfmpegFrameSource`].
#[derive(Debug, Clone)]
pub struct FfmpegSourceConfig {
    /// FFmpeg executable.
    pub ffmpeg: String,
    /// Maximum wait for a single frame.
    pub frame_timeout: Duration,
    /// Stop decoding after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for FfmpegSourceConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            frame_timeout: Duration::from_secs(30),
            max_frames: None,
        }
    }
}

/// Probe the first video stream of a file.
///
/// Fails when the container does not declare a frame count, since the
/// export plan cannot be computed without one.
pub fn probe_video(ffprobe: &str, path: &Path) -> Result<VideoInfo, FrameError> {
    if !path.exists() {
        return Err(FrameError::OpenFailed {
            path: path.to_path_buf(),
            message: "File does not exist".to_string(),
        });
    }

    let output = Command::new(ffprobe)
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,nb_frames")
        .args(["-of", "json"])
        .arg(path)
        .output()
        .map_err(|e| FrameError::ProbeFailed {
            path: path.to_path_buf(),
            message: format!("Failed to run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FrameError::ProbeFailed {
            path: path.to_path_buf(),
            message: stderr.trim().to_string(),
        });
    }

    let json: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
        FrameError::ProbeFailed {
            path: path.to_path_buf(),
            message: format!("Invalid ffprobe JSON: {}", e),
        }
    })?;

    parse_probe_json(&json).map_err(|message| FrameError::ProbeFailed {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse the JSON output of ffprobe's stream query.
fn parse_probe_json(json: &Value) -> Result<VideoInfo, String> {
    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream
        .get("width")
        .and_then(|w| w.as_u64())
        .ok_or_else(|| "missing width".to_string())? as u32;
    let height = stream
        .get("height")
        .and_then(|h| h.as_u64())
        .ok_or_else(|| "missing height".to_string())? as u32;

    let rate = stream
        .get("r_frame_rate")
        .and_then(|r| r.as_str())
        .ok_or_else(|| "missing r_frame_rate".to_string())?;
    let fps = parse_rate(rate).ok_or_else(|| format!("unusable frame rate '{}'", rate))?;

    let nb_frames = stream
        .get("nb_frames")
        .and_then(|n| n.as_str())
        .ok_or_else(|| "missing nb_frames".to_string())?;
    let frame_count = nb_frames
        .parse::<u64>()
        .map_err(|_| format!("nb_frames is '{}', container does not declare a frame count", nb_frames))?;

    Ok(VideoInfo {
        frame_count,
        fps,
        width,
        height,
    })
}

/// Parse an ffprobe rational such as `120000/1001`.
fn parse_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Frame source decoding through an `ffmpeg` rawvideo pipe.
pub struct FfmpegFrameSource {
    name: String,
    info: VideoInfo,
    child: Child,
    frames: Receiver<Result<Vec<u8>, String>>,
    frame_timeout: Duration,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Start decoding `path`, whose properties were probed beforehand.
    pub fn open(
        path: &Path,
        info: VideoInfo,
        config: &FfmpegSourceConfig,
    ) -> Result<Self, FrameError> {
        if !path.exists() {
            return Err(FrameError::OpenFailed {
                path: path.to_path_buf(),
                message: "File does not exist".to_string(),
            });
        }

        let mut cmd = Command::new(&config.ffmpeg);
        cmd.args(["-v", "error", "-i"]).arg(path).arg("-an");
        if let Some(limit) = config.max_frames {
            cmd.arg("-frames:v").arg(limit.to_string());
        }
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);
        cmd.stdin(Stdio::null())
            .stderr(Stdio::null())
            .stdout(Stdio::piped());

        tracing::debug!("[Optical] Running FFmpeg: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| FrameError::OpenFailed {
            path: path.to_path_buf(),
            message: format!("Failed to spawn FFmpeg: {}", e),
        })?;

        let mut stdout = child.stdout.take().ok_or_else(|| FrameError::OpenFailed {
            path: path.to_path_buf(),
            message: "Failed to capture FFmpeg stdout".to_string(),
        })?;

        let frame_len = info.width as usize * info.height as usize * 3;
        let (tx, rx) = mpsc::sync_channel(4);
        thread::spawn(move || loop {
            let mut buffer = vec![0u8; frame_len];
            match stdout.read_exact(&mut buffer) {
                Ok(()) => {
                    if tx.send(Ok(buffer)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }
            }
        });

        Ok(Self {
            name: display_name(path),
            info,
            child,
            frames: rx,
            frame_timeout: config.frame_timeout,
            frames_read: 0,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameError> {
        match self.frames.recv_timeout(self.frame_timeout) {
            Ok(Ok(buffer)) => {
                let index = self.frames_read;
                self.frames_read += 1;
                RgbImage::from_raw(self.info.width, self.info.height, buffer)
                    .map(Some)
                    .ok_or(FrameError::DecodeFailed {
                        index,
                        message: "short frame buffer".to_string(),
                    })
            }
            Ok(Err(message)) => Err(FrameError::DecodeFailed {
                index: self.frames_read,
                message,
            }),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(FrameError::Stalled {
                timeout_secs: self.frame_timeout.as_secs(),
                frames_read: self.frames_read,
            }),
        }
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn width(&self) -> u32 {
        self.info.width
    }

    fn height(&self) -> u32 {
        self.info.height
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

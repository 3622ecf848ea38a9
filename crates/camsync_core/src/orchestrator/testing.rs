//! In-memory media backend for orchestrator tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use super::backend::MediaBackend;
use super::runner::RunOptions;
use crate::audio::{AudioData, AudioResult};
use crate::config::Settings;
use crate::models::{CameraStream, VideoInfo};
use crate::optical::{FrameError, FrameSource, MemoryFrameSource};

pub(crate) const FRAMES: u64 = 80;
const RATE: u32 = 8000;

/// Cameras keyed by file stem; each carries a zero-based LED edge.
pub(crate) struct FakeBackend {
    edges: HashMap<String, Option<u64>>,
    audio_delay: HashMap<String, usize>,
}

impl FakeBackend {
    pub(crate) fn with_edges(edges: &[(&str, Option<u64>)]) -> Self {
        Self {
            edges: edges.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            audio_delay: HashMap::new(),
        }
    }

    /// Delay a camera's audio by `samples`.
    pub(crate) fn delay_audio(mut self, stem: &str, samples: usize) -> Self {
        self.audio_delay.insert(stem.to_string(), samples);
        self
    }

    fn stem(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl MediaBackend for FakeBackend {
    fn probe(&self, path: &Path) -> Result<VideoInfo, FrameError> {
        if !self.edges.contains_key(&Self::stem(path)) {
            return Err(FrameError::OpenFailed {
                path: path.to_path_buf(),
                message: "unknown test camera".into(),
            });
        }
        Ok(VideoInfo {
            frame_count: 1000,
            fps: 119.88,
            width: 8,
            height: 8,
        })
    }

    fn open_frames(
        &self,
        stream: &CameraStream,
        max_frames: u64,
    ) -> Result<Box<dyn FrameSource>, FrameError> {
        let edge = self.edges.get(&Self::stem(&stream.path)).copied().flatten();
        let frames = (0..FRAMES.min(max_frames))
            .map(|i| {
                let lit = edge.is_some_and(|e| i >= e);
                RgbImage::from_pixel(8, 8, if lit { Rgb([255, 255, 0]) } else { Rgb([0, 0, 0]) })
            })
            .collect();
        Ok(Box::new(MemoryFrameSource::new(Self::stem(&stream.path), frames, 119.88)))
    }

    fn audio_excerpt(
        &self,
        stream: &CameraStream,
        _start_secs: f64,
        _duration_secs: f64,
        _sample_rate: u32,
    ) -> AudioResult<AudioData> {
        let delay = self.audio_delay.get(&Self::stem(&stream.path)).copied().unwrap_or(0);
        let mut samples = vec![0.0; RATE as usize];
        for (start, len) in [(1000usize, 300usize), (3100, 600), (5600, 200)] {
            for i in 0..len {
                let idx = start + delay + i;
                if idx < samples.len() {
                    samples[idx] = if i % 2 == 0 { 0.8 } else { -0.8 };
                }
            }
        }
        Ok(AudioData::new(samples, RATE))
    }
}

/// Unit file with one yellow camera per stem, written into `dir`.
pub(crate) fn write_unit_file(dir: &Path, name: &str, stems: &[&str]) -> PathBuf {
    let mut text = format!("name = \"{}\"\n", name);
    for (i, stem) in stems.iter().enumerate() {
        text.push_str(&format!(
            "\n[[cameras]]\nindex = {}\npath = \"{}.MP4\"\nroi = [0, 0, 8, 8]\nled = \"Y\"\n",
            i + 1,
            stem
        ));
    }
    let path = dir.join(format!("{}.toml", name));
    std::fs::write(&path, text).unwrap();
    path
}

/// Dry-run options with every folder under `root`.
pub(crate) fn options_in(root: &Path) -> RunOptions {
    let mut options = RunOptions::from_settings(&settings());
    options.output_root = root.join("out");
    options.diagnostics_root = root.join("diag");
    options.logs_dir = root.join("logs");
    options.dry_run = true;
    options.log_config.show_timestamps = false;
    options
}

/// Settings matching [`options_in`].
pub(crate) fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.detection.search_horizon = 50;
    settings.audio.sample_rate = RATE;
    settings
}

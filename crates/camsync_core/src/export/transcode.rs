//! External transcoder invocation.

use std::process::Command;

use super::plan::{CameraExport, ExportError, ExportPlan};
use crate::config::ExportSettings;
use crate::logging::UnitLogger;
use crate::models::TranscodeProfile;

/// Encoder settings shared by every camera of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOptions {
    pub profile: TranscodeProfile,
    pub width: u32,
    pub height: u32,
    pub crf: u8,
    pub preset: String,
    pub bitrate: String,
}

impl From<&ExportSettings> for TranscodeOptions {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            profile: settings.profile,
            width: settings.output_width,
            height: settings.output_height,
            crf: settings.crf,
            preset: settings.preset.clone(),
            bitrate: settings.bitrate.clone(),
        }
    }
}

/// FFmpeg arguments trimming one camera to the shared frame range.
///
/// Both profiles seek after the input so the same frames are selected.
pub fn build_transcode_args(
    camera: &CameraExport,
    output_frames: u64,
    options: &TranscodeOptions,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        camera.input.display().to_string(),
        "-ss".into(),
        camera.seek_arg(),
        "-frames:v".into(),
        output_frames.to_string(),
    ];

    match options.profile {
        TranscodeProfile::Software => {
            args.extend([
                "-vf".into(),
                format!("scale={}:{}", options.width, options.height),
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                options.preset.clone(),
                "-movflags".into(),
                "+faststart".into(),
                "-crf".into(),
                options.crf.to_string(),
            ]);
        }
        TranscodeProfile::Hardware => {
            args.extend([
                "-vf".into(),
                format!("hwupload_cuda,scale_cuda={}:{}", options.width, options.height),
                "-c:v".into(),
                "h264_nvenc".into(),
                "-preset".into(),
                options.preset.clone(),
                "-movflags".into(),
                "+faststart".into(),
                "-b:v".into(),
                options.bitrate.clone(),
            ]);
        }
    }

    args.push(camera.output.display().to_string());
    args
}

/// Runs the planned transcodes one camera at a time.
pub struct Transcoder {
    ffmpeg: String,
    options: TranscodeOptions,
    dry_run: bool,
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<String>, options: TranscodeOptions, dry_run: bool) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            options,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run every camera's transcode, stopping at the first failure.
    pub fn run(&self, plan: &ExportPlan, logger: &UnitLogger) -> Result<(), ExportError> {
        logger.section(&format!(
            "Transcoding {} cameras ({})",
            plan.cameras.len(),
            self.options.profile.name()
        ));

        for camera in &plan.cameras {
            let args = build_transcode_args(camera, plan.output_frames, &self.options);
            logger.command(&format!("{} {}", self.ffmpeg, args.join(" ")));

            if self.dry_run {
                continue;
            }

            if let Some(parent) = camera.output.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ExportError::io("creating output directory", e))?;
            }

            logger.clear_tail();
            let result = Command::new(&self.ffmpeg)
                .args(&args)
                .output()
                .map_err(|e| ExportError::io("executing ffmpeg", e))?;

            let stderr = String::from_utf8_lossy(&result.stderr);
            for line in stderr.lines() {
                logger.output_line(line);
            }

            let exit_code = result.status.code().unwrap_or(-1);
            if exit_code != 0 {
                logger.show_tail("ffmpeg output");
                let message = stderr
                    .lines()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("")
                    .to_string();
                return Err(ExportError::TranscodeFailed {
                    camera: camera.camera,
                    exit_code,
                    message,
                });
            }

            logger.success(&format!(
                "{} trimmed to {}",
                camera.camera,
                camera
                    .output
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ));
        }

        Ok(())
    }
}

//! `ffprobe`/`ffmpeg` subprocess backend

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::DynamicImage;
use tracing::debug;

use super::{MediaHandle, MediaProbe};
use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::resource::VideoResource;

/// Media probe that shells out to the ffmpeg tool suite.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegProbe {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.ffmpeg, &config.ffprobe)
    }
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl MediaProbe for FfmpegProbe {
    fn open(&self, resource: &VideoResource) -> Result<Box<dyn MediaHandle>, MediaError> {
        let locator = resource.locator();
        if let VideoResource::LocalPath { path, .. } = resource {
            if !path.is_file() {
                return Err(MediaError::Unreadable {
                    locator,
                    reason: "file does not exist".to_string(),
                });
            }
        }
        Ok(Box::new(FfmpegHandle {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            input: media_input(resource),
            locator,
            duration: None,
        }))
    }
}

/// Input argument for the tools.
///
/// Relative paths are anchored at `.` so a name starting with `-` is not
/// parsed as an option.
fn media_input(resource: &VideoResource) -> OsString {
    match resource {
        VideoResource::LocalPath { path, .. } if path.is_relative() => {
            Path::new(".").join(path).into_os_string()
        }
        VideoResource::LocalPath { path, .. } => path.clone().into_os_string(),
        VideoResource::DocumentHandle { id, .. } => OsString::from(id),
    }
}

struct FfmpegHandle {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    input: OsString,
    locator: String,
    /// Probed once per handle
    duration: Option<Option<i64>>,
}

impl FfmpegHandle {
    fn probe_duration(&self) -> Result<Option<i64>, MediaError> {
        let output = run(
            Command::new(&self.ffprobe)
                .arg("-v")
                .arg("error")
                .arg("-show_entries")
                .arg("format=duration")
                .arg("-of")
                .arg("default=noprint_wrappers=1:nokey=1")
                .arg(&self.input),
            &self.ffprobe,
            &self.locator,
        )?;
        Ok(parse_duration_seconds(&String::from_utf8_lossy(&output.stdout)))
    }

    fn extract_frame(&self, micros: i64) -> Result<DynamicImage, MediaError> {
        let seconds = micros.max(0) as f64 / 1_000_000.0;
        let output = run(
            Command::new(&self.ffmpeg)
                .arg("-v")
                .arg("error")
                .arg("-ss")
                .arg(format!("{:.3}", seconds))
                .arg("-i")
                .arg(&self.input)
                .arg("-frames:v")
                .arg("1")
                .arg("-f")
                .arg("image2pipe")
                .arg("-vcodec")
                .arg("png")
                .arg("-"),
            &self.ffmpeg,
            &self.locator,
        )?;
        if output.stdout.is_empty() {
            return Err(MediaError::Unreadable {
                locator: self.locator.clone(),
                reason: format!("no frame at {:.3}s", seconds),
            });
        }
        Ok(image::load_from_memory(&output.stdout)?)
    }
}

impl MediaHandle for FfmpegHandle {
    fn duration_millis(&mut self) -> Option<i64> {
        if let Some(cached) = self.duration {
            return cached;
        }
        let duration = match self.probe_duration() {
            Ok(duration) => duration,
            Err(e) => {
                debug!("{}", e);
                None
            }
        };
        self.duration = Some(duration);
        duration
    }

    fn frame_at(&mut self, micros: i64) -> Option<DynamicImage> {
        match self.extract_frame(micros) {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

fn run(command: &mut Command, tool: &Path, locator: &str) -> Result<Output, MediaError> {
    let output = command.output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            MediaError::ToolUnavailable {
                tool: tool.display().to_string(),
            }
        } else {
            MediaError::Io(e)
        }
    })?;
    if !output.status.success() {
        return Err(MediaError::Unreadable {
            locator: locator.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Parse ffprobe's `format=duration` output (fractional seconds) to millis.
fn parse_duration_seconds(s: &str) -> Option<i64> {
    let seconds: f64 = s.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0).round() as i64)
}

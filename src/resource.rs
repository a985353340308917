//! Video resources and folder scanning
//!
//! A [`VideoResource`] is the caller-owned identity of a playable source.
//! The cache only ever looks at its `(locator, last_modified)` projection.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// File extensions recognised as video files (compared lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp",
];

/// A playable video source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoResource {
    /// A file on the local filesystem.
    LocalPath {
        path: PathBuf,
        /// Modification time in milliseconds since the Unix epoch.
        last_modified: i64,
    },
    /// An entry handed out by a document provider (e.g. a `content://` URI).
    DocumentHandle {
        id: String,
        display_name: String,
        last_modified: i64,
    },
}

impl VideoResource {
    /// Build a local resource by reading the file's modification time.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to stat video file: {}", path.display()))?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(Self::LocalPath {
            path,
            last_modified,
        })
    }

    /// The string the media backend opens and the key deriver hashes.
    pub fn locator(&self) -> String {
        match self {
            Self::LocalPath { path, .. } => path.to_string_lossy().into_owned(),
            Self::DocumentHandle { id, .. } => id.clone(),
        }
    }

    /// Modification time in milliseconds since the Unix epoch.
    pub fn last_modified(&self) -> i64 {
        match self {
            Self::LocalPath { last_modified, .. } | Self::DocumentHandle { last_modified, .. } => {
                *last_modified
            }
        }
    }

    /// Human-facing name, used in log records and listings.
    pub fn display_name(&self) -> String {
        match self {
            Self::LocalPath { path, .. } => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string(),
            Self::DocumentHandle { display_name, .. } => display_name.clone(),
        }
    }
}

/// Check whether a file name carries one of the [`VIDEO_EXTENSIONS`].
pub fn is_video_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the video files directly inside `dir`, sorted by display name.
///
/// Subdirectories are not descended into. Entries that vanish or cannot be
/// stat'ed mid-scan are skipped.
pub fn scan_folder(dir: &Path) -> Result<Vec<VideoResource>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read video folder: {}", dir.display()))?;

    let mut videos: Vec<VideoResource> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_video_file_name)
        })
        .filter_map(|path| VideoResource::from_path(path).ok())
        .collect();

    videos.sort_by_key(|v| v.display_name().to_lowercase());
    Ok(videos)
}

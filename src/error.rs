//! Error types for the artifact store and the media backend.
//!
//! Neither error escapes the cache coordinator: callers of the public
//! cache surface only ever see a miss. These types exist so the lower
//! layers can be tested and logged precisely.

use std::path::PathBuf;

/// Errors raised by [`ArtifactStore`](crate::store::ArtifactStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to delete cache entry {path}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to list cache directory {path}: {source}")]
    List {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised by a [`MediaProbe`](crate::media::MediaProbe) backend.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media tool not available: {tool}")]
    ToolUnavailable { tool: String },

    #[error("Cannot open media {locator}: {reason}")]
    Unreadable { locator: String, reason: String },

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

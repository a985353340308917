//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};

use crate::key::KeyHash;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Cache directory and size budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_directory")]
    pub directory: String,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default)]
    pub key_hash: KeyHash,
}

pub fn default_directory() -> String {
    dirs::cache_dir()
        .map(|dir| {
            dir.join("vidcache")
                .join("video_thumbnails")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "~/.cache/vidcache/video_thumbnails".to_string())
}

pub fn default_max_size_mb() -> u64 {
    50
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            max_size_mb: default_max_size_mb(),
            key_hash: KeyHash::default(),
        }
    }
}

/// Thumbnail output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

pub fn default_width() -> u32 {
    200
}

pub fn default_height() -> u32 {
    150
}

pub fn default_jpeg_quality() -> u8 {
    85
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Worker pools and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Threads serving on-demand thumbnail and metadata requests
    #[serde(default = "default_interactive")]
    pub interactive: usize,
    /// Threads dedicated to precaching
    #[serde(default = "default_background")]
    pub background: usize,
    /// Pause between precached items
    #[serde(default = "default_precache_delay_ms")]
    pub precache_delay_ms: u64,
    /// How long shutdown waits for in-flight work
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Re-run eviction after this many cache writes (0 = startup only)
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval: u64,
}

pub fn default_interactive() -> usize {
    3
}

pub fn default_background() -> usize {
    2
}

pub fn default_precache_delay_ms() -> u64 {
    50
}

pub fn default_shutdown_grace_secs() -> u64 {
    5
}

pub fn default_eviction_interval() -> u64 {
    32
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            interactive: default_interactive(),
            background: default_background(),
            precache_delay_ms: default_precache_delay_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            eviction_interval: default_eviction_interval(),
        }
    }
}

/// External media tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

pub fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

pub fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Size budget and thumbnail geometry used by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheBudget {
    pub max_bytes: u64,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

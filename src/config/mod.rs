//! Configuration management for vidcache

mod io;
mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Config {
    /// Get the config file path (~/.config/vidcache/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        io::load()
    }

    /// Load configuration from an explicit file, or defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        io::load_from(path)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        io::save_to(self, path)
    }

    /// Expand ~ in the cache directory path
    pub fn cache_directory(&self) -> PathBuf {
        let dir = &self.cache.directory;
        if let Some(stripped) = dir.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        PathBuf::from(dir)
    }

    /// Size budget and thumbnail geometry
    pub fn budget(&self) -> CacheBudget {
        CacheBudget {
            max_bytes: self.cache.max_size_mb.saturating_mul(1024 * 1024),
            thumbnail_width: self.thumbnail.width,
            thumbnail_height: self.thumbnail.height,
        }
    }

    pub fn precache_delay(&self) -> Duration {
        Duration::from_millis(self.workers.precache_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.workers.shutdown_grace_secs)
    }

    /// Check values that would make the cache unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers.interactive == 0 {
            return Err("workers.interactive must be at least 1".to_string());
        }
        if self.workers.background == 0 {
            return Err("workers.background must be at least 1".to_string());
        }
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err("thumbnail.width and thumbnail.height must be non-zero".to_string());
        }
        if !(1..=100).contains(&self.thumbnail.jpeg_quality) {
            return Err(format!(
                "thumbnail.jpeg_quality must be between 1 and 100, got {}",
                self.thumbnail.jpeg_quality
            ));
        }
        Ok(())
    }
}

//! Scan command handler

use anyhow::Result;
use std::path::Path;

use vidcache::{scan_folder, MetadataKind, ThumbnailCache, VideoResource};

use super::{load_config, open_cache};

/// Placeholder shown for videos without a cached duration.
const NOT_CACHED: &str = "--:--";

/// List the videos in `dir` with whatever durations are already cached.
///
/// Never generates anything; run `precache` first to fill the column.
#[cfg(not(tarpaulin_include))]
pub fn handle(dir: &Path, cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let videos = scan_folder(dir)?;
    if videos.is_empty() {
        println!("No videos found in {}", dir.display());
        return Ok(());
    }

    let (cache, _queue) = open_cache(&config);
    for line in format_listing(&cache, &videos) {
        println!("{}", line);
    }
    cache.shutdown();

    println!("\n{} videos", videos.len());
    Ok(())
}

fn format_listing(cache: &ThumbnailCache, videos: &[VideoResource]) -> Vec<String> {
    videos
        .iter()
        .map(|video| {
            let duration = cache
                .get_cached_metadata(video, MetadataKind::Duration)
                .unwrap_or_else(|| NOT_CACHED.to_string());
            format!("{:>8}  {}", duration, video.display_name())
        })
        .collect()
}

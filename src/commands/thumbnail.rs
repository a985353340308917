//! Thumbnail command handler

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use vidcache::VideoResource;

use super::{await_result, load_config, open_cache};

/// Fetch or generate the thumbnail for `file` and write it as JPEG.
#[cfg(not(tarpaulin_include))]
pub fn handle(file: &Path, output: Option<&Path>, cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let resource = VideoResource::from_path(file)?;
    let (cache, queue) = open_cache(&config);

    let thumbnail = await_result::<Option<Vec<u8>>, _>(&queue, |callback| {
        cache.get_thumbnail(&resource, callback)
    });
    cache.shutdown();

    let Some(bytes) = thumbnail? else {
        bail!("Could not extract a frame from {}", file.display());
    };

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(file));
    fs::write(&out, &bytes)
        .with_context(|| format!("Failed to write thumbnail: {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

/// `<stem>.jpg` in the current directory.
fn default_output(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "thumbnail".to_string());
    PathBuf::from(format!("{}.jpg", stem))
}

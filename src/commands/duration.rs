//! Duration command handler

use anyhow::Result;
use std::path::Path;

use vidcache::VideoResource;

use super::{await_result, load_config, open_cache};

/// Print the `MM:SS` duration of `file`, or `Unknown`.
#[cfg(not(tarpaulin_include))]
pub fn handle(file: &Path, cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let resource = VideoResource::from_path(file)?;
    let (cache, queue) = open_cache(&config);

    let duration =
        await_result::<String, _>(&queue, |callback| cache.get_duration(&resource, callback));
    cache.shutdown();

    println!("{}", duration?);
    Ok(())
}

//! Clear command handler

use anyhow::Result;
use std::path::Path;

use super::{load_config, open_cache};

/// Delete every cached artifact.
///
/// The clear runs on the cache's worker pool; shutdown waits for it.
#[cfg(not(tarpaulin_include))]
pub fn handle(cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let (cache, _queue) = open_cache(&config);
    let before = cache.stats()?.entry_count;

    cache.clear_cache();
    if !cache.shutdown() {
        anyhow::bail!("Timed out while clearing the cache");
    }

    println!(
        "Removed {} entries from {}",
        before,
        config.cache_directory().display()
    );
    Ok(())
}

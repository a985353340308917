//! Status command handler

use anyhow::Result;
use humansize::{format_size, BINARY};
use std::path::Path;

use vidcache::ArtifactStore;

use super::load_config;

/// Display cache statistics.
///
/// Shows the directory, total size against the budget, entry counts and
/// the age of the oldest entry.
#[cfg(not(tarpaulin_include))]
pub fn handle(cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let store = ArtifactStore::new(config.cache_directory());
    let stats = store.stats()?;
    let budget = config.budget();

    println!("Directory: {}", store.dir().display());
    println!("{}", stats.summary());
    println!("   Budget: {}", format_size(budget.max_bytes, BINARY));
    Ok(())
}

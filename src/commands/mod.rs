//! Command handlers for the vidcache CLI.
//!
//! Each submodule handles one CLI command. The dispatch itself stays in
//! main.rs.

pub mod clear;
pub mod config;
pub mod duration;
pub mod precache;
pub mod scan;
pub mod status;
pub mod thumbnail;

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use vidcache::{ChannelDispatcher, CompletionQueue, Config, ThumbnailCache};

/// How long a single thumbnail or duration request may take.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Load the configuration, applying a `--cache-dir` override.
pub fn load_config(cache_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::load()?;
    apply_cache_dir(&mut config, cache_dir);
    Ok(config)
}

fn apply_cache_dir(config: &mut Config, cache_dir: Option<&Path>) {
    if let Some(dir) = cache_dir {
        config.cache.directory = dir.to_string_lossy().into_owned();
    }
}

/// Open the cache with completions delivered to the calling thread.
pub fn open_cache(config: &Config) -> (ThumbnailCache, CompletionQueue) {
    let (dispatcher, queue) = ChannelDispatcher::new();
    let cache = ThumbnailCache::open(config, Arc::new(dispatcher));
    (cache, queue)
}

/// Issue one callback-style request and block until its result arrives.
pub fn await_result<T, F>(queue: &CompletionQueue, request: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Box<dyn FnOnce(T) + Send>),
{
    let (tx, rx) = mpsc::channel();
    request(Box::new(move |value| {
        let _ = tx.send(value);
    }));
    if !queue.run_one(REQUEST_TIMEOUT) {
        bail!("Timed out waiting for the cache");
    }
    rx.try_recv().context("Cache request finished without a result")
}

//! Precache command handler

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vidcache::{scan_folder, PrecacheProgress, PrecacheState};

use super::{load_config, open_cache};

/// How often the wait loop checks for Ctrl-C.
const TICK: Duration = Duration::from_millis(100);

/// Progress line on stderr.
struct ProgressLine {
    done: Arc<AtomicBool>,
}

impl PrecacheProgress for ProgressLine {
    fn on_progress(&self, processed: usize, total: usize) {
        eprint!("\rPrecaching durations: {}/{}", processed, total);
        let _ = io::stderr().flush();
    }

    fn on_complete(&self) {
        eprintln!();
        self.done.store(true, Ordering::SeqCst);
    }
}

/// Warm duration metadata for every video in `dir`. Ctrl-C cancels.
#[cfg(not(tarpaulin_include))]
pub fn handle(dir: &Path, cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    let videos = scan_folder(dir)?;
    if videos.is_empty() {
        println!("No videos found in {}", dir.display());
        return Ok(());
    }
    let total = videos.len();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let (cache, queue) = open_cache(&config);
    let done = Arc::new(AtomicBool::new(false));
    cache.precache_metadata(
        videos,
        ProgressLine {
            done: Arc::clone(&done),
        },
    );

    loop {
        if queue.run_until(TICK, || done.load(Ordering::SeqCst)) {
            break;
        }
        if interrupted.load(Ordering::SeqCst) {
            cache.cancel_precaching();
            break;
        }
    }

    let state = cache.precache_state();
    cache.shutdown();

    match state {
        PrecacheState::Cancelled => {
            eprintln!();
            println!("Precaching cancelled");
        }
        _ => println!("Precached durations for {} videos", total),
    }
    Ok(())
}

//! Bulk metadata precaching
//!
//! A [`PrecacheJob`] walks a resource list one item at a time, reporting
//! progress through the completion dispatcher. Cancellation is cooperative
//! and takes effect between items: an item that has started always
//! finishes, but nothing is reported for it once the job is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::resource::VideoResource;

/// Lifecycle of a precache run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecacheState {
    Idle,
    Running { total: usize, processed: usize },
    Cancelled,
    Completed,
}

/// Receives precache progress on the completion context.
pub trait PrecacheProgress: Send + Sync {
    /// Called after each item with strictly increasing `processed`.
    fn on_progress(&self, processed: usize, total: usize);

    /// Called once after the last item, unless the run was cancelled.
    fn on_complete(&self);
}

/// Progress sink that ignores every report.
pub struct NoProgress;

impl PrecacheProgress for NoProgress {
    fn on_progress(&self, _processed: usize, _total: usize) {}

    fn on_complete(&self) {}
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one item of a precache run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Already cached and fresh
    Skipped,
    /// Generated and written through
    Cached,
    /// Generation failed; counted as processed
    Failed,
}

/// One precache run over a fixed resource list.
pub struct PrecacheJob {
    total: usize,
    token: CancelToken,
    state: Mutex<PrecacheState>,
}

impl PrecacheJob {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            token: CancelToken::default(),
            state: Mutex::new(PrecacheState::Running {
                total,
                processed: 0,
            }),
        }
    }

    pub fn state(&self) -> PrecacheState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the run if it is still running. Returns whether it was.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, PrecacheState::Running { .. }) {
            *state = PrecacheState::Cancelled;
            self.token.cancel();
            true
        } else {
            false
        }
    }

    /// Walk `resources`, calling `item` for each and pausing `delay` in
    /// between. Blocks the calling (background) thread.
    pub fn run(
        &self,
        resources: &[VideoResource],
        delay: Duration,
        dispatcher: &Arc<dyn Dispatcher>,
        progress: &Arc<dyn PrecacheProgress>,
        mut item: impl FnMut(&VideoResource) -> ItemOutcome,
    ) {
        debug!("Starting metadata precaching for {} videos", self.total);
        let mut processed = 0;
        let mut failed = 0;

        for resource in resources {
            if self.token.is_cancelled() {
                debug!("Precaching cancelled after {} videos", processed);
                return;
            }

            if item(resource) == ItemOutcome::Failed {
                failed += 1;
            }
            processed += 1;

            {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if *state == PrecacheState::Cancelled {
                    debug!("Precaching cancelled after {} videos", processed);
                    return;
                }
                *state = PrecacheState::Running {
                    total: self.total,
                    processed,
                };
            }

            let token = self.token.clone();
            let progress = Arc::clone(progress);
            let total = self.total;
            dispatcher.post(Box::new(move || {
                if !token.is_cancelled() {
                    progress.on_progress(processed, total);
                }
            }));

            if !delay.is_zero() && processed < self.total {
                thread::sleep(delay);
            }
        }

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == PrecacheState::Cancelled {
                return;
            }
            *state = PrecacheState::Completed;
        }

        debug!(
            "Metadata precaching completed for {} videos ({} failed)",
            processed, failed
        );
        let progress = Arc::clone(progress);
        dispatcher.post(Box::new(move || progress.on_complete()));
    }
}

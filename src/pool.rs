//! Bounded worker pools
//!
//! A fixed number of threads pull boxed jobs off one shared channel.
//! Shutting down closes the channel; workers drain what is queued and
//! exit. If they do not finish before the deadline the pool is aborted:
//! queued jobs are dropped unrun and the threads are left to finish their
//! current job on their own.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

/// A unit of work run on a pool thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// How often shutdown re-checks for finished workers.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    aborted: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn `size` worker threads named `<name>-<n>`.
    pub fn new(name: &str, size: usize) -> Self {
        let (sender, receiver) = channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let aborted = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(size);
        for n in 0..size.max(1) {
            let rx = Arc::clone(&receiver);
            let aborted = Arc::clone(&aborted);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, n))
                .spawn(move || worker_loop(rx, aborted));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to spawn {} worker: {}", name, e),
            }
        }

        Self {
            name: name.to_string(),
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            aborted,
        }
    }

    /// Queue a job. Returns `false` once the pool has been shut down.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => {
                debug!("{} pool is shut down; job rejected", self.name);
                false
            }
        }
    }

    /// Stop accepting work and wait until `deadline` for workers to drain.
    ///
    /// Returns `true` if every worker exited in time. On timeout, queued
    /// jobs are discarded and `false` is returned.
    pub fn shutdown(&self, deadline: Instant) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        while handles.iter().any(|h| !h.is_finished()) {
            if Instant::now() >= deadline {
                warn!(
                    "{} pool did not drain before the deadline; aborting queued work",
                    self.name
                );
                self.aborted.store(true, Ordering::SeqCst);
                // Detach the stragglers
                handles.clear();
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        for handle in handles.drain(..) {
            let _ = handle.join();
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn worker_loop(rx: Arc<Mutex<Receiver<Job>>>, aborted: Arc<AtomicBool>) {
    loop {
        let job = {
            let rx = rx.lock().unwrap_or_else(PoisonError::into_inner);
            match rx.recv() {
                Ok(job) => job,
                Err(_) => return, // channel closed
            }
        };
        if aborted.load(Ordering::SeqCst) {
            continue;
        }
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(
                "Job panicked on {}",
                thread::current().name().unwrap_or("worker")
            );
        }
    }
}

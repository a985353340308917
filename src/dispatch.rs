//! Completion-context dispatch
//!
//! Cache results are never handed to callers on a worker thread. Workers
//! post a closure to a [`Dispatcher`], which runs it on the caller's chosen
//! context in posting order.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::error;

/// A completion callback ready to run.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs posted tasks on the caller's completion context, in order.
pub trait Dispatcher: Send + Sync {
    fn post(&self, task: Task);
}

/// Dispatcher whose tasks run when the owning thread polls its
/// [`CompletionQueue`], like a UI event loop draining its message queue.
pub struct ChannelDispatcher {
    tx: Mutex<Sender<Task>>,
}

/// Receiving half of a [`ChannelDispatcher`]. Stays on the caller's thread.
pub struct CompletionQueue {
    rx: Receiver<Task>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, CompletionQueue) {
        let (tx, rx) = channel();
        (Self { tx: Mutex::new(tx) }, CompletionQueue { rx })
    }
}

impl Dispatcher for ChannelDispatcher {
    fn post(&self, task: Task) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        // Ignore send errors (the completion context may have gone away)
        let _ = tx.send(task);
    }
}

impl CompletionQueue {
    /// Run every task that is ready now. Returns how many ran.
    pub fn poll(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it.
    ///
    /// Returns `false` on timeout or when every dispatcher has been dropped.
    pub fn run_one(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }

    /// Run tasks as they arrive until `done` returns true or `timeout` passes.
    ///
    /// Returns the final value of `done`.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while !done() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(task) => task(),
                Err(_) => return done(),
            }
        }
        true
    }
}

/// Dispatcher backed by one dedicated thread that runs tasks in order.
pub struct ThreadDispatcher {
    tx: Mutex<Option<Sender<Task>>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadDispatcher {
    pub fn new(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = channel::<Task>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
                        error!("Completion callback panicked");
                    }
                }
            })?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Some(handle),
        })
    }
}

impl Dispatcher for ThreadDispatcher {
    fn post(&self, task: Task) {
        if let Some(tx) = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = tx.send(task);
        }
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = self.handle.take() {
            // Never join from the dispatcher's own thread
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

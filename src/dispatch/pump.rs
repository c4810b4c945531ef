use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::dispatch::queue::{Thunk, Trampoline};

/// Channel-backed main loop for embedders without a GUI event loop of their own.
///
/// The trampoline returned by [`MainPump::trampoline`] only enqueues; the owner thread runs the
/// queued thunks by calling [`MainPump::run_pending`] or [`MainPump::run_until`].
pub struct MainPump {
    tx: Sender<Thunk>,
    rx: Receiver<Thunk>,
}

impl Default for MainPump {
    fn default() -> Self {
        Self::new()
    }
}

impl MainPump {
    /// Create an empty pump.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Trampoline that forwards thunks to this pump.
    pub fn trampoline(&self) -> Trampoline {
        let tx = self.tx.clone();
        Arc::new(move |thunk: Thunk| {
            let _ = tx.send(thunk);
        })
    }

    /// Number of thunks waiting to run.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every thunk queued so far without blocking. Returns how many ran.
    ///
    /// Thunks enqueued while draining also run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(thunk) = self.rx.try_recv() {
            thunk();
            ran += 1;
        }
        ran
    }

    /// Run thunks as they arrive until `done` returns `true` or `timeout` elapses.
    ///
    /// `done` is checked before waiting and after every thunk. Returns the final value of `done`.
    pub fn run_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(thunk) => thunk(),
                Err(RecvTimeoutError::Timeout) => return done(),
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }

    /// Keep running thunks until none arrive for `quiet`. Returns how many ran.
    pub fn run_until_idle(&self, quiet: Duration) -> usize {
        let mut ran = 0;
        while let Ok(thunk) = self.rx.recv_timeout(quiet) {
            thunk();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/pump.rs"]
mod tests;

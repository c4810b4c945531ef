use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};

use crate::dispatch::queue::{Executor, FailureRoute, Queue, Thunk};
use crate::foundation::error::DispatchResult;

/// Executor backed by one dedicated worker thread draining a FIFO channel.
struct SerialExecutor {
    // `None` once the owning `SerialQueue` has been dropped.
    tx: Mutex<Option<Sender<Thunk>>>,
    worker: OnceLock<ThreadId>,
    name: String,
}

impl Executor for SerialExecutor {
    fn invoke(&self, thunk: Thunk) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match tx {
            Some(tx) if tx.send(thunk).is_ok() => {}
            _ => tracing::warn!(queue = %self.name, "work submitted to a closed serial queue was dropped"),
        }
    }

    fn is_current(&self) -> bool {
        self.worker.get() == Some(&thread::current().id())
    }

    fn label(&self) -> &'static str {
        "serial"
    }
}

/// A private queue that runs its work items one at a time, in submission order, on a dedicated
/// worker thread.
///
/// Created with [`crate::DispatchContext::create_serial_queue`] and exclusively owned by its
/// creator. Dropping it closes the queue, lets the worker finish every item already queued and
/// joins the thread. Cloned [`Queue`] handles obtained through [`SerialQueue::handle`] stay valid
/// afterwards but drop any further work (and `submit_sync` reports
/// [`crate::WorkFailure::Abandoned`]).
pub struct SerialQueue {
    queue: Queue,
    exec: Arc<SerialExecutor>,
    join: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.exec.name)
            .finish()
    }
}

impl SerialQueue {
    pub(crate) fn spawn(name: String, route: FailureRoute) -> DispatchResult<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Thunk>();
        let exec = Arc::new(SerialExecutor {
            tx: Mutex::new(Some(tx)),
            worker: OnceLock::new(),
            name: name.clone(),
        });

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(rx))?;
        let _ = exec.worker.set(join.thread().id());
        tracing::debug!(queue = %name, "serial queue started");

        Ok(Self {
            queue: Queue::new(exec.clone(), route),
            exec,
            join: Some(join),
        })
    }

    /// Worker thread name.
    pub fn name(&self) -> &str {
        &self.exec.name
    }

    /// A cloneable handle to this queue, e.g. for work items that need to resubmit.
    pub fn handle(&self) -> Queue {
        self.queue.clone()
    }
}

impl std::ops::Deref for SerialQueue {
    type Target = Queue;

    fn deref(&self) -> &Queue {
        &self.queue
    }
}

fn run_worker(rx: Receiver<Thunk>) {
    // Every thunk arrives wrapped by `Queue`, which catches panics, so the loop only ends once
    // all senders are gone and the backlog is drained.
    for thunk in rx {
        thunk();
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.exec
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let Some(join) = self.join.take() else {
            return;
        };
        if self.exec.is_current() {
            // Dropped from one of its own work items: the worker exits on its own once this
            // item returns.
            tracing::debug!(queue = %self.exec.name, "serial queue dropped on its own worker, detaching");
            return;
        }
        if join.join().is_err() {
            tracing::error!(queue = %self.exec.name, "serial worker thread panicked");
        }
        tracing::debug!(queue = %self.exec.name, "serial queue stopped");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/serial.rs"]
mod tests;

use std::sync::Arc;

use crate::dispatch::failure::{WorkFailure, capture};

/// A unit of deferred work.
pub type Thunk = Box<dyn FnOnce() + Send + 'static>;

/// "How to run a thunk on the main context", installed once per dispatch context.
///
/// The trampoline may run the thunk immediately when it is already called on the main thread.
pub type Trampoline = Arc<dyn Fn(Thunk) + Send + Sync + 'static>;

/// Receives failures captured from `submit_async` work. Always invoked on the main queue.
pub type FailureHandler = Arc<dyn Fn(WorkFailure) + Send + Sync + 'static>;

/// Trampoline that runs every thunk immediately on the calling thread.
pub fn inline_trampoline() -> Trampoline {
    Arc::new(|thunk: Thunk| thunk())
}

/// The capability every queue variant provides: run a thunk on its context.
pub(crate) trait Executor: Send + Sync {
    /// Arrange for `thunk` to run once on this executor's thread(s).
    fn invoke(&self, thunk: Thunk);

    /// Return `true` when the calling thread belongs to this executor.
    fn is_current(&self) -> bool;

    fn label(&self) -> &'static str;
}

/// Where failures from asynchronous work end up.
#[derive(Clone)]
pub(crate) struct FailureRoute {
    pub(crate) main: Trampoline,
    pub(crate) handler: FailureHandler,
}

impl FailureRoute {
    fn surface(&self, failure: WorkFailure) {
        let handler = Arc::clone(&self.handler);
        (self.main)(Box::new(move || handler(failure)));
    }
}

/// Handle to an execution context.
///
/// Cloning a `Queue` produces another handle to the same context. The failure capture and
/// main-queue redirect logic lives here once; the variants only differ in how they run a thunk.
#[derive(Clone)]
pub struct Queue {
    exec: Arc<dyn Executor>,
    route: FailureRoute,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.exec.label())
            .finish()
    }
}

impl Queue {
    pub(crate) fn new(exec: Arc<dyn Executor>, route: FailureRoute) -> Self {
        Self { exec, route }
    }

    /// Short label identifying the queue variant (`"main"`, `"background"`, `"serial"`).
    pub fn label(&self) -> &'static str {
        self.exec.label()
    }

    /// Return `true` when the calling thread is one of this queue's threads.
    pub fn is_current(&self) -> bool {
        self.exec.is_current()
    }

    /// Enqueue `work` and return immediately.
    ///
    /// `work` runs exactly once on this queue's context, after every item submitted earlier to
    /// the same queue. If it panics the failure is captured and handed to the dispatch
    /// context's failure handler on the main queue; the worker keeps running.
    pub fn submit_async<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(move || {
            work();
            Ok(())
        });
    }

    /// Like [`Queue::submit_async`] for fallible work: an `Err` takes the same path as a panic.
    pub fn try_submit_async<F>(&self, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.dispatch(work);
    }

    fn dispatch<F>(&self, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let route = self.route.clone();
        let label = self.exec.label();
        self.exec.invoke(Box::new(move || {
            let failure = match capture(work) {
                Ok(Ok(())) => return,
                Ok(Err(err)) => WorkFailure::Failed(err),
                Err(panicked) => panicked,
            };
            tracing::debug!(queue = label, %failure, "async work failed, surfacing on main queue");
            route.surface(failure);
        }));
    }

    /// Run `work` on this queue and block until it has finished.
    ///
    /// A failure is returned to the caller instead of being redirected to the main queue. When
    /// the caller is already running on this queue (for example a serial queue's own work item,
    /// or the main thread submitting to the main queue) `work` runs inline, so this never
    /// deadlocks on itself.
    pub fn submit_sync<F, R>(&self, work: F) -> Result<R, WorkFailure>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.exec.is_current() {
            return capture(work);
        }

        let (tx, rx) = crossbeam_channel::bounded::<Result<R, WorkFailure>>(1);
        self.exec.invoke(Box::new(move || {
            let _ = tx.send(capture(work));
        }));
        rx.recv().unwrap_or_else(|_| {
            Err(WorkFailure::Abandoned {
                queue: self.exec.label(),
            })
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/queue.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use crate::dispatch::failure::WorkFailure;
use crate::dispatch::queue::{
    Executor, FailureHandler, FailureRoute, Queue, Thunk, Trampoline,
};
use crate::dispatch::serial::SerialQueue;
use crate::foundation::error::{DispatchError, DispatchResult};

/// Options for building a [`DispatchContext`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DispatchOpts {
    /// Background pool worker threads. `None` uses rayon defaults; `Some(0)` is rejected.
    pub background_threads: Option<usize>,
    /// Prefix for serial worker thread names; a per-context counter is appended.
    pub serial_thread_name: String,
}

impl Default for DispatchOpts {
    fn default() -> Self {
        Self {
            background_threads: None,
            serial_thread_name: "serial-queue".to_string(),
        }
    }
}

struct MainExecutor {
    trampoline: Trampoline,
    thread: ThreadId,
}

impl Executor for MainExecutor {
    fn invoke(&self, thunk: Thunk) {
        (self.trampoline)(thunk);
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn label(&self) -> &'static str {
        "main"
    }
}

struct BackgroundExecutor {
    pool: rayon::ThreadPool,
}

impl Executor for BackgroundExecutor {
    fn invoke(&self, thunk: Thunk) {
        self.pool.spawn(thunk);
    }

    fn is_current(&self) -> bool {
        self.pool.current_thread_index().is_some()
    }

    fn label(&self) -> &'static str {
        "background"
    }
}

struct ContextInner {
    main: Queue,
    background: Queue,
    route: FailureRoute,
    opts: DispatchOpts,
    next_serial: AtomicU64,
}

/// Owner of the well-known queues.
///
/// Holds the main queue (work runs through the installed trampoline on the owner thread), the
/// shared background queue (a rayon pool) and the factory for private serial queues. Cloning is
/// cheap and every clone reaches the same queues.
#[derive(Clone)]
pub struct DispatchContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("opts", &self.inner.opts)
            .finish()
    }
}

impl DispatchContext {
    /// Start building a context around `trampoline`.
    ///
    /// Unless [`DispatchContextBuilder::main_thread`] overrides it, the thread calling
    /// [`DispatchContextBuilder::build`] is recorded as the main thread.
    pub fn builder(trampoline: Trampoline) -> DispatchContextBuilder {
        DispatchContextBuilder {
            trampoline,
            opts: DispatchOpts::default(),
            handler: None,
            main_thread: None,
        }
    }

    /// Build a context with default options and the logging failure handler.
    pub fn new(trampoline: Trampoline) -> DispatchResult<Self> {
        Self::builder(trampoline).build()
    }

    /// The main queue.
    pub fn main_queue(&self) -> &Queue {
        &self.inner.main
    }

    /// The shared background queue.
    pub fn background_queue(&self) -> &Queue {
        &self.inner.background
    }

    /// Create a new private serial queue with its own worker thread.
    pub fn create_serial_queue(&self) -> DispatchResult<SerialQueue> {
        let n = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{n}", self.inner.opts.serial_thread_name);
        SerialQueue::spawn(name, self.inner.route.clone())
    }

    /// Options this context was built with.
    pub fn opts(&self) -> &DispatchOpts {
        &self.inner.opts
    }
}

/// Builder returned by [`DispatchContext::builder`].
pub struct DispatchContextBuilder {
    trampoline: Trampoline,
    opts: DispatchOpts,
    handler: Option<FailureHandler>,
    main_thread: Option<ThreadId>,
}

impl DispatchContextBuilder {
    /// Replace the dispatch options.
    pub fn opts(mut self, opts: DispatchOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Install the handler that receives failures from asynchronous work on the main queue.
    pub fn on_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(WorkFailure) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Designate the main thread explicitly.
    pub fn main_thread(mut self, id: ThreadId) -> Self {
        self.main_thread = Some(id);
        self
    }

    /// Build the context, starting the background pool.
    pub fn build(self) -> DispatchResult<DispatchContext> {
        let pool = build_background_pool(&self.opts)?;
        let handler = self.handler.unwrap_or_else(|| Arc::new(log_failure));
        let route = FailureRoute {
            main: Arc::clone(&self.trampoline),
            handler,
        };

        let main = Queue::new(
            Arc::new(MainExecutor {
                trampoline: self.trampoline,
                thread: self.main_thread.unwrap_or_else(|| thread::current().id()),
            }),
            route.clone(),
        );
        let background = Queue::new(Arc::new(BackgroundExecutor { pool }), route.clone());

        tracing::debug!(
            background_threads = ?self.opts.background_threads,
            "dispatch context ready"
        );
        Ok(DispatchContext {
            inner: Arc::new(ContextInner {
                main,
                background,
                route,
                opts: self.opts,
                next_serial: AtomicU64::new(0),
            }),
        })
    }
}

fn build_background_pool(opts: &DispatchOpts) -> DispatchResult<rayon::ThreadPool> {
    if let Some(n) = opts.background_threads
        && n == 0
    {
        return Err(DispatchError::InvalidOption(
            "background_threads must be >= 1 when set".to_string(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("background-{i}"));
    if let Some(n) = opts.background_threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DispatchError::ThreadPool(e.to_string()))
}

fn log_failure(failure: WorkFailure) {
    tracing::error!(%failure, "unhandled failure in asynchronous work");
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/context.rs"]
mod tests;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;

/// Panic payload carried by [`WorkFailure::Panicked`].
///
/// Only reachable by value or through `&mut`, so the failure stays `Sync` whatever the payload
/// type is.
pub struct PanicPayload(Mutex<Box<dyn Any + Send>>);

impl PanicPayload {
    /// Take the payload out, e.g. for [`std::panic::resume_unwind`].
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.0.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get_mut(&mut self) -> &mut Box<dyn Any + Send> {
        self.0.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PanicPayload { .. }")
    }
}

/// A failure captured while running work on a queue.
///
/// Panics and errors raised by work items never unwind through a queue's worker thread; they are
/// captured into this value and either returned to a synchronous caller or surfaced on the main
/// queue.
#[derive(thiserror::Error, Debug)]
pub enum WorkFailure {
    /// The work item panicked.
    #[error("work panicked: {message}")]
    Panicked {
        /// Panic message when the payload was a string, a placeholder otherwise.
        message: String,
        /// Original panic payload.
        payload: PanicPayload,
    },

    /// Fallible work returned an error.
    #[error("work failed: {0:#}")]
    Failed(anyhow::Error),

    /// The queue was shut down before the work item could run.
    #[error("work abandoned: {queue} queue is closed")]
    Abandoned {
        /// Label of the queue that dropped the work.
        queue: &'static str,
    },
}

impl WorkFailure {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self::Panicked {
            message,
            payload: PanicPayload(Mutex::new(payload)),
        }
    }

    /// Borrow the error returned by fallible work as `T`.
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Failed(err) => err.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Mutably borrow a panic payload (`std::panic::panic_any(value)`) as `T`.
    pub fn payload_mut<T: 'static>(&mut self) -> Option<&mut T> {
        match self {
            Self::Panicked { payload, .. } => payload.get_mut().downcast_mut::<T>(),
            _ => None,
        }
    }

    /// Take the panic payload, or get the failure back if it was not a panic.
    pub fn try_into_panic(self) -> Result<Box<dyn Any + Send>, Self> {
        match self {
            Self::Panicked { payload, .. } => Ok(payload.into_inner()),
            other => Err(other),
        }
    }

    /// Return `true` when the work item panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Panic message, if the work item panicked.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Self::Panicked { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Re-raise the failure as a panic on the current thread.
    ///
    /// Panics keep their original payload so `catch_unwind` callers further up can downcast it.
    pub fn resume_unwind(self) -> ! {
        match self.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            Err(other) => std::panic::panic_any(other.to_string()),
        }
    }
}

/// Run `work`, converting a panic into a [`WorkFailure`].
pub(crate) fn capture<R>(work: impl FnOnce() -> R) -> Result<R, WorkFailure> {
    catch_unwind(AssertUnwindSafe(work)).map_err(WorkFailure::from_panic)
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/failure.rs"]
mod tests;

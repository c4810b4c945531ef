//! Work-dispatch queues.
//!
//! Three kinds of execution context share one [`Queue`] handle type:
//!
//! - **main**: runs work on the owner/UI thread through a [`Trampoline`] installed once,
//! - **background**: a shared rayon pool for work with no ordering requirements,
//! - **serial**: a private FIFO worker thread per resource ([`SerialQueue`]).
//!
//! `submit_async` failures (panics or `Err` from fallible work) are captured as a
//! [`WorkFailure`] and surfaced on the main queue; `submit_sync` failures go back to the caller.

pub(crate) mod context;
pub(crate) mod failure;
pub(crate) mod pump;
pub(crate) mod queue;
pub(crate) mod registry;
pub(crate) mod serial;

//! Process-wide accessors over one installed [`DispatchContext`].
//!
//! Components that can take a context by reference should do so; these accessors exist for code
//! that needs "the" main queue without threading a handle through.

use std::sync::OnceLock;

use crate::dispatch::context::DispatchContext;
use crate::dispatch::queue::{Queue, Trampoline};
use crate::dispatch::serial::SerialQueue;
use crate::foundation::error::{DispatchError, DispatchResult};

static GLOBAL: OnceLock<DispatchContext> = OnceLock::new();

/// Install `main_trampoline` and build the process-wide context with default options.
///
/// Must be called exactly once, on the main thread, before any accessor in this module.
pub fn initialize_dispatch(main_trampoline: Trampoline) -> DispatchResult<()> {
    if GLOBAL.get().is_some() {
        return Err(DispatchError::AlreadyInitialized);
    }
    install_dispatch(DispatchContext::new(main_trampoline)?)
}

/// Install an already-built context as the process-wide one.
pub fn install_dispatch(ctx: DispatchContext) -> DispatchResult<()> {
    GLOBAL
        .set(ctx)
        .map_err(|_| DispatchError::AlreadyInitialized)
}

/// The process-wide context, if one has been installed.
pub fn try_global() -> Option<&'static DispatchContext> {
    GLOBAL.get()
}

/// The process-wide context.
///
/// # Panics
///
/// Panics when called before [`initialize_dispatch`] or [`install_dispatch`]; using the queues
/// before initialization is a programming error.
pub fn global() -> &'static DispatchContext {
    match GLOBAL.get() {
        Some(ctx) => ctx,
        None => panic!("dispatch used before initialize_dispatch"),
    }
}

/// The process-wide main queue. Panics before initialization.
pub fn main_queue() -> &'static Queue {
    global().main_queue()
}

/// The process-wide background queue. Panics before initialization.
pub fn background_queue() -> &'static Queue {
    global().background_queue()
}

/// Create a serial queue from the process-wide context. Panics before initialization.
pub fn create_serial_queue() -> DispatchResult<SerialQueue> {
    global().create_serial_queue()
}

//! # loop-atexit
//!
//! `atexit` for event loops: register cleanup callbacks that run when the
//! current event loop closes, instead of when the process exits.
//!
//! Callbacks are kept per loop. Closing a loop runs its callbacks in
//! registration order, driving future-returning callbacks to completion on
//! that same loop, and only then shuts the loop down. A failing callback is
//! logged and does not stop the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loop_atexit::EventLoop;
//!
//! let mut event_loop = EventLoop::new()?;
//! event_loop.run_until_complete(async {
//!     loop_atexit::register(|| println!("sync cleanup"))?;
//!     loop_atexit::register_async(|| async { println!("async cleanup") })?;
//!     Ok::<(), loop_atexit::AtExitError>(())
//! })??;
//!
//! // Runs both callbacks, then shuts the loop down.
//! event_loop.close();
//! # Ok::<(), loop_atexit::AtExitError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod errors;
pub mod event_loop;
pub mod registry;
pub mod testing;

#[cfg(test)]
mod integration_tests;

pub use errors::{AtExitError, CallbackError, CallbackFailure, Result};
pub use event_loop::{current_loop, run, EventLoop, LoopConfig, LoopHandle, LoopId, LoopPhase};
pub use registry::{Callback, CallbackId, DrainReport, IntoCallbackResult, LoopRegistry};

use std::future::Future;

/// Registers a synchronous callback to run when the current loop closes.
///
/// Fails with [`AtExitError::NoRunningLoop`] when no loop is running on this
/// thread. Uses the process-wide [`LoopRegistry::global`].
pub fn register<F, R>(callback: F) -> Result<CallbackId>
where
    F: FnOnce() -> R + Send + 'static,
    R: IntoCallbackResult,
{
    LoopRegistry::global().register(Callback::sync(callback))
}

/// Registers a future-returning callback to run when the current loop closes.
///
/// The future is driven to completion on the closing loop before the next
/// callback starts.
pub fn register_async<F, Fut>(callback: F) -> Result<CallbackId>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future + 'static,
    Fut::Output: IntoCallbackResult,
{
    LoopRegistry::global().register(Callback::future(callback))
}

/// Removes a callback registered on the current loop.
///
/// Returns whether anything was removed.
pub fn unregister(id: CallbackId) -> Result<bool> {
    LoopRegistry::global().unregister(id)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::{AtExitError, CallbackError, CallbackFailure};
    pub use crate::event_loop::{current_loop, EventLoop, LoopConfig, LoopHandle, LoopId};
    pub use crate::registry::{Callback, CallbackId, DrainReport, LoopRegistry};
    pub use crate::{register, register_async, unregister};
}

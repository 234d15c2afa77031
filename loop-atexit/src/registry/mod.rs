//! Loop-keyed registry of exit callbacks and the drain that runs them.
//!
//! This module provides:
//! - Callback for sync and future-returning exit callbacks
//! - LoopRegistry, the injectable loop-to-callbacks map
//! - DrainExecutor and DrainReport for running a loop's callbacks on close

mod callback;
mod drain;
mod store;

pub use callback::{Callback, CallbackId, CallbackResult, IntoCallbackResult};
pub use drain::{DrainExecutor, DrainReport};
pub use store::LoopRegistry;

pub(crate) use drain::drain_callbacks;

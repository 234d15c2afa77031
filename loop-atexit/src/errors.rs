//! Error types for loop-scoped exit callbacks.
//!
//! Only registration-time and loop-lifecycle failures are raised to callers.
//! Failures of the callbacks themselves are reported through [`CallbackError`]
//! and never abort a drain.

use crate::event_loop::LoopId;
use crate::registry::CallbackId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AtExitError>;

/// The main error type for loop-atexit operations.
#[derive(Debug, Error)]
pub enum AtExitError {
    /// No event loop is running on the calling thread.
    #[error("no running event loop")]
    NoRunningLoop,

    /// The target loop has already been closed and its registry entry is gone.
    #[error("event loop {0} is already closed")]
    LoopAlreadyClosed(LoopId),

    /// A loop was asked to run while another loop or runtime is running on this thread.
    #[error("cannot run an event loop while another one is running on this thread")]
    NestedLoop,

    /// The underlying runtime could not be built.
    #[error("failed to build event loop runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Why a single callback failed during a drain.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The callback returned an error.
    #[error("callback returned an error: {0:#}")]
    Failed(anyhow::Error),

    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Builds a [`CallbackError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_string());
        Self::Panicked(message)
    }
}

/// A failed callback as recorded in a [`DrainReport`](crate::registry::DrainReport).
#[derive(Debug)]
pub struct CallbackFailure {
    /// The id handed out when the callback was registered.
    pub callback: CallbackId,
    /// What went wrong.
    pub error: CallbackError,
}

impl std::fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit callback {} failed: {}", self.callback, self.error)
    }
}

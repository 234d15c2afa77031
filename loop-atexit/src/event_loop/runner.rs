//! The [`EventLoop`] wrapper and its close sequence.

use super::config::LoopConfig;
use super::identity::{has_current_loop, CurrentLoopGuard, LoopHandle, LoopId, LoopPhase};
use crate::errors::{AtExitError, Result};
use crate::registry::{drain_callbacks, DrainReport};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, debug_span, error};

/// A single-threaded event loop whose [`close`](Self::close) runs exit callbacks.
///
/// While [`run_until_complete`](Self::run_until_complete) executes, the loop is
/// the thread's current loop, so code running on it can register callbacks with
/// [`register`](crate::register). Closing drains every registry that hooked
/// into this loop, in registration order, and only then shuts the runtime down.
/// Dropping an unclosed loop closes it.
pub struct EventLoop {
    handle: LoopHandle,
    runtime: Option<Runtime>,
    shutdown_timeout: Duration,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(LoopConfig::default())
    }

    /// Creates a loop from `config`.
    pub fn with_config(config: LoopConfig) -> Result<Self> {
        let mut builder = Builder::new_current_thread();
        if config.enable_io {
            builder.enable_io();
        }
        if config.enable_time {
            builder.enable_time();
        }
        if let Some(name) = &config.name {
            builder.thread_name(name);
        }
        let runtime = builder.build()?;

        let handle = LoopHandle::new(config.name);
        debug!(loop_id = %handle.id(), "Created event loop");

        Ok(Self {
            handle,
            runtime: Some(runtime),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Returns the loop's identity.
    #[must_use]
    pub fn id(&self) -> LoopId {
        self.handle.id()
    }

    /// Returns a handle to this loop, usable from other threads.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LoopPhase {
        self.handle.phase()
    }

    /// Returns true once the loop has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.runtime.is_none()
    }

    /// Runs `future` on this loop until it completes.
    ///
    /// Fails with [`AtExitError::LoopAlreadyClosed`] after close, and with
    /// [`AtExitError::NestedLoop`] when called from code already running on
    /// a loop or inside another tokio runtime.
    pub fn run_until_complete<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or(AtExitError::LoopAlreadyClosed(self.id()))?;

        if has_current_loop() || tokio::runtime::Handle::try_current().is_ok() {
            return Err(AtExitError::NestedLoop);
        }

        let _current = CurrentLoopGuard::enter(self.handle.clone());
        Ok(runtime.block_on(future))
    }

    /// Runs pending exit callbacks, then shuts the loop down.
    ///
    /// Callbacks run one at a time in registration order; future-returning
    /// ones are driven to completion on this loop before the next starts.
    /// Failures are logged and collected in the report, never propagated.
    /// A second call does nothing and returns an empty report.
    ///
    /// There is no timeout on callbacks: one that never finishes blocks close.
    pub fn close(&mut self) -> DrainReport {
        let Some(runtime) = self.runtime.take() else {
            return DrainReport::default();
        };

        let span = debug_span!(
            "loop_close",
            loop_id = %self.id(),
            name = self.handle.name().unwrap_or_default()
        );
        let _enter = span.enter();

        self.handle.begin_drain();

        let in_runtime = tokio::runtime::Handle::try_current().is_ok();
        let report = if in_runtime {
            error!("Event loop closed from inside an async context, draining on a helper thread");
            let handle = &self.handle;
            let runtime = &runtime;
            std::thread::scope(|scope| scope.spawn(|| drain_loop(handle, runtime)).join())
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        } else {
            drain_loop(&self.handle, &runtime)
        };

        if in_runtime {
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(self.shutdown_timeout);
        }

        debug!(
            completed = report.completed,
            failed = report.failures.len(),
            "Event loop closed"
        );
        report
    }
}

/// Drains hooked registries until a round finds nothing, then marks the loop closed.
///
/// Each round merges every hooked registry's callbacks back into registration order.
/// Callbacks may register more callbacks on this loop; those run in a later round.
fn drain_loop(handle: &LoopHandle, runtime: &Runtime) -> DrainReport {
    let _current = CurrentLoopGuard::enter(handle.clone());
    let mut report = DrainReport::for_loop(handle.id());
    let mut round = 0_usize;

    loop {
        let mut callbacks: Vec<_> = handle
            .drain_hooks()
            .iter()
            .filter_map(|registry| registry.take(handle.id()))
            .flatten()
            .collect();

        if callbacks.is_empty() {
            if handle.try_finish_drain() {
                return report;
            }
        } else {
            // Ids come from one process-wide counter, so they order registrations across registries.
            callbacks.sort_by_key(|(id, _)| *id);
            debug!(round, count = callbacks.len(), "Draining exit callbacks");
            drain_callbacks(runtime, callbacks, &mut report);
        }
        round += 1;
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            debug!(loop_id = %self.id(), "Closing event loop on drop");
            let _report = self.close();
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("handle", &self.handle)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Runs `future` on a fresh loop and closes the loop afterwards.
pub fn run<F: Future>(future: F) -> Result<F::Output> {
    let mut event_loop = EventLoop::new()?;
    let output = event_loop.run_until_complete(future);
    event_loop.close();
    output
}

//! Running drained callbacks in registration order.

use super::callback::{Callback, CallbackId, CallbackKind, CallbackResult};
use crate::errors::{CallbackError, CallbackFailure};
use crate::event_loop::LoopId;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Something that can block until a future completes.
///
/// Exit callbacks that return futures are driven through this while the
/// loop is closing, so it must still be able to run tasks at that point.
pub trait DrainExecutor {
    /// Runs `future` to completion on the calling thread.
    fn run_to_completion(&self, future: LocalBoxFuture<'_, CallbackResult>) -> CallbackResult;
}

impl DrainExecutor for tokio::runtime::Runtime {
    fn run_to_completion(&self, future: LocalBoxFuture<'_, CallbackResult>) -> CallbackResult {
        self.block_on(future)
    }
}

/// Summary of one `close`.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// The loop that was closed, `None` if the close was a no-op.
    pub loop_id: Option<LoopId>,
    /// Callbacks that completed without error.
    pub completed: usize,
    /// Callbacks that failed, in the order they ran.
    pub failures: Vec<CallbackFailure>,
}

impl DrainReport {
    pub(crate) fn for_loop(id: LoopId) -> Self {
        Self {
            loop_id: Some(id),
            ..Self::default()
        }
    }

    /// Total number of callbacks invoked.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.completed + self.failures.len()
    }

    /// Returns true if every callback succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs `callbacks` one after another, recording failures without stopping.
pub(crate) fn drain_callbacks<E>(
    executor: &E,
    callbacks: Vec<(CallbackId, Callback)>,
    report: &mut DrainReport,
) where
    E: DrainExecutor + ?Sized,
{
    for (id, callback) in callbacks {
        match invoke(executor, callback) {
            Ok(()) => report.completed += 1,
            Err(error) => {
                warn!(callback = %id, "Exit callback failed: {}", error);
                report.failures.push(CallbackFailure { callback: id, error });
            }
        }
    }
}

fn invoke<E>(executor: &E, callback: Callback) -> CallbackResult
where
    E: DrainExecutor + ?Sized,
{
    match callback.kind {
        CallbackKind::Sync(f) => panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(CallbackError::from_panic(payload.as_ref()))),
        CallbackKind::Async(f) => {
            let future = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| CallbackError::from_panic(payload.as_ref()))?;
            executor.run_to_completion(
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .map(|outcome| {
                        outcome.unwrap_or_else(|payload| {
                            Err(CallbackError::from_panic(payload.as_ref()))
                        })
                    })
                    .boxed_local(),
            )
        }
    }
}

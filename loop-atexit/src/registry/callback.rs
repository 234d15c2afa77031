//! Exit callback records.

use crate::errors::CallbackError;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of running one callback.
pub type CallbackResult = Result<(), CallbackError>;

type SyncFn = Box<dyn FnOnce() -> CallbackResult + Send>;
type AsyncFn = Box<dyn FnOnce() -> LocalBoxFuture<'static, CallbackResult> + Send>;

/// Identifies one registration; returned by `register` and accepted by `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cb-{}", self.0)
    }
}

/// Values a callback may return: `()` or `Result<(), E>`.
pub trait IntoCallbackResult {
    /// Converts the value into a [`CallbackResult`].
    fn into_callback_result(self) -> CallbackResult;
}

impl IntoCallbackResult for () {
    fn into_callback_result(self) -> CallbackResult {
        Ok(())
    }
}

impl<E> IntoCallbackResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_callback_result(self) -> CallbackResult {
        self.map_err(|e| CallbackError::Failed(e.into()))
    }
}

pub(crate) enum CallbackKind {
    Sync(SyncFn),
    Async(AsyncFn),
}

/// A zero-argument function to run when a loop closes.
///
/// Synchronous callbacks are called directly. Future-returning callbacks are
/// run to completion on the closing loop before the next callback starts.
/// The future itself does not need to be `Send`.
pub struct Callback {
    pub(crate) kind: CallbackKind,
}

impl Callback {
    /// Wraps a synchronous callback.
    pub fn sync<F, R>(callback: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: IntoCallbackResult,
    {
        Self {
            kind: CallbackKind::Sync(Box::new(move || callback().into_callback_result())),
        }
    }

    /// Wraps a callback that returns a future.
    pub fn future<F, Fut>(callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoCallbackResult,
    {
        Self {
            kind: CallbackKind::Async(Box::new(move || {
                callback().map(IntoCallbackResult::into_callback_result).boxed_local()
            })),
        }
    }

    /// Returns true for future-returning callbacks.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self.kind, CallbackKind::Async(_))
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("async", &self.is_async())
            .finish()
    }
}

//! Testing utilities for exit callbacks.
//!
//! [`CallRecorder`] hands out callbacks that record a label when they run,
//! so tests can assert which callbacks ran and in what order.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records the labels of callbacks in the order they were invoked.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `label` immediately.
    pub fn record(&self, label: impl Into<String>) {
        self.calls.lock().push(label.into());
    }

    /// A synchronous callback that records `label`.
    pub fn sync_marker(&self, label: impl Into<String>) -> impl FnOnce() + Send + 'static {
        let recorder = self.clone();
        let label = label.into();
        move || recorder.record(label)
    }

    /// A future-returning callback that records `label` when the future runs.
    pub fn async_marker(
        &self,
        label: impl Into<String>,
    ) -> impl FnOnce() -> BoxFuture<'static, ()> + Send + 'static {
        let recorder = self.clone();
        let label = label.into();
        move || Box::pin(async move { recorder.record(label) })
    }

    /// Returns the recorded labels.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns how many calls were recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

//! The registry mapping loop identities to pending exit callbacks.

use super::callback::{Callback, CallbackId};
use crate::errors::Result;
use crate::event_loop::{current_loop, LoopHandle, LoopId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static GLOBAL_REGISTRY: OnceLock<Arc<LoopRegistry>> = OnceLock::new();

/// Pending callbacks for one loop.
#[derive(Default)]
struct LoopEntry {
    callbacks: Vec<(CallbackId, Callback)>,
}

/// Maps each loop to the callbacks to run when it closes.
///
/// An entry exists only while a loop has pending callbacks. It is created on
/// the first registration and removed when the loop's `close` drains it, so a
/// second close finds nothing to run. Entries for different loops never share
/// state; the map itself is safe to use from many loop threads at once.
#[derive(Default)]
pub struct LoopRegistry {
    entries: DashMap<LoopId, Mutex<LoopEntry>>,
}

impl LoopRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the free `register` functions.
    pub fn global() -> &'static Arc<Self> {
        GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::new()))
    }

    /// Registers `callback` on the loop running on this thread.
    ///
    /// Fails with [`AtExitError::NoRunningLoop`](crate::AtExitError::NoRunningLoop)
    /// outside a running loop, in which case nothing is recorded.
    pub fn register(self: &Arc<Self>, callback: Callback) -> Result<CallbackId> {
        let handle = current_loop()?;
        self.register_on(&handle, callback)
    }

    /// Registers `callback` on a specific loop, running or not.
    ///
    /// The first registration for a loop hooks this registry into the loop's
    /// close. Registering the same logic twice runs it twice.
    pub fn register_on(self: &Arc<Self>, handle: &LoopHandle, callback: Callback) -> Result<CallbackId> {
        let loop_id = handle.id();
        handle.with_open_lifecycle(|lifecycle| {
            let mut slot = self.entries.entry(loop_id).or_insert_with(|| {
                debug!(loop_id = %loop_id, "Creating exit registry entry");
                Mutex::new(LoopEntry::default())
            });
            if lifecycle.install_drain_hook(self) {
                debug!(loop_id = %loop_id, "Installed drain hook");
            }

            let id = CallbackId::next();
            slot.value_mut().get_mut().callbacks.push((id, callback));
            id
        })
    }

    /// Removes every pending registration with `id` from the current loop.
    ///
    /// Returns whether anything was removed.
    pub fn unregister(&self, id: CallbackId) -> Result<bool> {
        let handle = current_loop()?;
        Ok(self.unregister_on(&handle, id))
    }

    /// Removes every pending registration with `id` from a specific loop.
    ///
    /// When the loop has no callbacks left its entry is deleted.
    pub fn unregister_on(&self, handle: &LoopHandle, id: CallbackId) -> bool {
        let loop_id = handle.id();
        let removed = match self.entries.get_mut(&loop_id) {
            Some(mut slot) => {
                let entry = slot.value_mut().get_mut();
                let before = entry.callbacks.len();
                entry.callbacks.retain(|(cb_id, _)| *cb_id != id);
                entry.callbacks.len() != before
            }
            None => false,
        };

        if removed {
            self.entries
                .remove_if(&loop_id, |_, entry| entry.lock().callbacks.is_empty());
        }
        removed
    }

    /// Removes and returns a loop's pending callbacks in registration order.
    pub(crate) fn take(&self, loop_id: LoopId) -> Option<Vec<(CallbackId, Callback)>> {
        self.entries
            .remove(&loop_id)
            .map(|(_, entry)| entry.into_inner().callbacks)
    }

    /// Returns true if the loop has an entry.
    #[must_use]
    pub fn contains(&self, loop_id: LoopId) -> bool {
        self.entries.contains_key(&loop_id)
    }

    /// Number of callbacks waiting for the loop to close.
    #[must_use]
    pub fn pending_count(&self, loop_id: LoopId) -> usize {
        self.entries
            .get(&loop_id)
            .map_or(0, |entry| entry.lock().callbacks.len())
    }

    /// Number of loops with pending callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no loop has pending callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for LoopRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopRegistry")
            .field("loops", &self.len())
            .finish()
    }
}

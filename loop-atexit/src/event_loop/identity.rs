//! Loop identity and the thread's current running loop.

use crate::errors::{AtExitError, Result};
use crate::registry::LoopRegistry;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_LOOP: RefCell<Option<LoopHandle>> = const { RefCell::new(None) };
}

/// Process-unique identity of an event loop.
///
/// Ids are never reused, so two loops created one after the other are
/// always distinct registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(u64);

impl LoopId {
    fn next() -> Self {
        Self(NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LoopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loop-{}", self.0)
    }
}

/// Lifecycle phase of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Accepting work and registrations.
    Open,
    /// `close` is running exit callbacks.
    Draining,
    /// Fully shut down.
    Closed,
}

/// Phase plus the registries that hooked into this loop's close.
pub(crate) struct Lifecycle {
    phase: LoopPhase,
    drain_hooks: Vec<Arc<LoopRegistry>>,
}

impl Lifecycle {
    /// Records `registry` as one to drain on close. Returns false if it was already hooked.
    pub(crate) fn install_drain_hook(&mut self, registry: &Arc<LoopRegistry>) -> bool {
        if self.drain_hooks.iter().any(|r| Arc::ptr_eq(r, registry)) {
            return false;
        }
        self.drain_hooks.push(Arc::clone(registry));
        true
    }
}

struct LoopState {
    id: LoopId,
    name: Option<String>,
    lifecycle: Mutex<Lifecycle>,
}

/// A cheap, clonable reference to an event loop's shared state.
///
/// Handles stay valid after the loop closes; registering through them then
/// fails with [`AtExitError::LoopAlreadyClosed`].
#[derive(Clone)]
pub struct LoopHandle {
    state: Arc<LoopState>,
}

impl LoopHandle {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            state: Arc::new(LoopState {
                id: LoopId::next(),
                name,
                lifecycle: Mutex::new(Lifecycle {
                    phase: LoopPhase::Open,
                    drain_hooks: Vec::new(),
                }),
            }),
        }
    }

    /// Returns the loop's identity.
    #[must_use]
    pub fn id(&self) -> LoopId {
        self.state.id
    }

    /// Returns the configured loop name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LoopPhase {
        self.state.lifecycle.lock().phase
    }

    /// Returns true once the loop has fully closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase() == LoopPhase::Closed
    }

    /// Runs `f` under the lifecycle lock, unless the loop is closed.
    pub(crate) fn with_open_lifecycle<T>(&self, f: impl FnOnce(&mut Lifecycle) -> T) -> Result<T> {
        let mut lifecycle = self.state.lifecycle.lock();
        if lifecycle.phase == LoopPhase::Closed {
            return Err(AtExitError::LoopAlreadyClosed(self.id()));
        }
        Ok(f(&mut lifecycle))
    }

    /// Moves an open loop into the draining phase. Returns false if it was already closed.
    pub(crate) fn begin_drain(&self) -> bool {
        let mut lifecycle = self.state.lifecycle.lock();
        match lifecycle.phase {
            LoopPhase::Closed => false,
            _ => {
                lifecycle.phase = LoopPhase::Draining;
                true
            }
        }
    }

    pub(crate) fn drain_hooks(&self) -> Vec<Arc<LoopRegistry>> {
        self.state.lifecycle.lock().drain_hooks.clone()
    }

    /// Marks the loop closed if no hooked registry still holds callbacks for it.
    ///
    /// The check and the transition happen under the lifecycle lock, which
    /// registration also holds, so nothing can be registered in between.
    pub(crate) fn try_finish_drain(&self) -> bool {
        let mut lifecycle = self.state.lifecycle.lock();
        let id = self.id();
        if lifecycle.drain_hooks.iter().any(|r| r.contains(id)) {
            return false;
        }
        lifecycle.phase = LoopPhase::Closed;
        lifecycle.drain_hooks.clear();
        true
    }
}

impl PartialEq for LoopHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for LoopHandle {}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Returns the loop currently running on this thread.
///
/// Inside [`EventLoop::run_until_complete`](super::EventLoop::run_until_complete),
/// in tasks spawned from it, and inside exit callbacks, this is that loop.
pub fn current_loop() -> Result<LoopHandle> {
    CURRENT_LOOP
        .with(|current| current.borrow().clone())
        .ok_or(AtExitError::NoRunningLoop)
}

pub(crate) fn has_current_loop() -> bool {
    CURRENT_LOOP.with(|current| current.borrow().is_some())
}

/// Makes a loop the thread's current loop until dropped.
pub(crate) struct CurrentLoopGuard {
    previous: Option<LoopHandle>,
}

impl CurrentLoopGuard {
    pub(crate) fn enter(handle: LoopHandle) -> Self {
        let previous = CURRENT_LOOP.with(|current| current.replace(Some(handle)));
        Self { previous }
    }
}

impl Drop for CurrentLoopGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_LOOP.with(|current| *current.borrow_mut() = previous);
    }
}

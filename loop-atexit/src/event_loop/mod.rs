//! The event loop wrapper whose close runs exit callbacks.
//!
//! This module provides:
//! - EventLoop, a single-threaded tokio runtime with an explicit drain point
//! - LoopId and LoopHandle for loop identity
//! - current_loop for resolving the loop running on this thread

mod config;
mod identity;
mod runner;

pub use config::LoopConfig;
pub use identity::{current_loop, LoopHandle, LoopId, LoopPhase};
pub use runner::{run, EventLoop};

#[cfg(test)]
pub(crate) use identity::CurrentLoopGuard;

//! Event loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for an [`EventLoop`](super::EventLoop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Label used in logs and as the runtime's thread name.
    pub name: Option<String>,
    /// Enable the tokio IO driver.
    pub enable_io: bool,
    /// Enable the tokio time driver.
    pub enable_time: bool,
    /// How long leftover runtime tasks get to stop once exit callbacks have drained.
    ///
    /// This never bounds the exit callbacks themselves.
    pub shutdown_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            name: None,
            enable_io: true,
            enable_time: true,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl LoopConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loop name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enables or disables the IO driver.
    #[must_use]
    pub fn with_io(mut self, enabled: bool) -> Self {
        self.enable_io = enabled;
        self
    }

    /// Enables or disables the time driver.
    #[must_use]
    pub fn with_time(mut self, enabled: bool) -> Self {
        self.enable_time = enabled;
        self
    }

    /// Sets the runtime shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

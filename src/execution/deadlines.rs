//! Deadlines applied to Docker engine calls.
//!
//! The daemon API itself has no timeouts; every call issued by
//! [`crate::execution::DockerClient`] is bounded by one of these limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-call deadlines for engine operations, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDeadlines {
    /// Lookups, create, start.
    pub api_timeout_secs: u64,
    /// Image builds.
    pub build_timeout_secs: u64,
    /// Commands executed inside a container.
    pub exec_timeout_secs: u64,
    /// Time the daemon waits for a container to exit before killing it.
    pub stop_grace_secs: u64,
}

impl Default for EngineDeadlines {
    fn default() -> Self {
        Self {
            api_timeout_secs: 60,
            build_timeout_secs: 3600, // 1 hour
            exec_timeout_secs: 3600,
            stop_grace_secs: 10,
        }
    }
}

impl EngineDeadlines {
    /// Deadline for plain API calls.
    pub fn api(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Deadline for an image build, including streaming its output.
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// Deadline for an exec, including reading its output.
    pub fn exec(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Deadline for a stop call: the grace period plus one API round trip.
    pub fn stop(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs.saturating_add(self.api_timeout_secs))
    }
}

//! Container engine capability and the types it exchanges.
//!
//! [`ContainerEngine`] is the seam between the project state machine and the
//! daemon. Every method maps to exactly one remote call; idempotency rules live
//! one level up, in [`crate::project::Project`].

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DockerError;

/// Lifecycle state of a container as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container is created but not started.
    Created,
    /// Container is running.
    Running,
    /// Container is paused.
    Paused,
    /// Container is restarting.
    Restarting,
    /// Container has exited.
    Exited { exit_code: i64 },
    /// Container is being removed.
    Removing,
    /// Container is dead.
    Dead,
    /// Unknown status.
    Unknown(String),
}

impl ContainerState {
    /// Maps a daemon status string (and exit code, if any) to a state.
    pub fn from_status(status: &str, exit_code: Option<i64>) -> Self {
        match status {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited {
                exit_code: exit_code.unwrap_or(-1),
            },
            "dead" => ContainerState::Dead,
            other => ContainerState::Unknown(other.to_string()),
        }
    }

    /// True when the container's process is up and can accept exec calls.
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running | ContainerState::Restarting)
    }

    /// True when a stop request has something to stop.
    pub fn needs_stop(&self) -> bool {
        matches!(
            self,
            ContainerState::Running
                | ContainerState::Paused
                | ContainerState::Restarting
                | ContainerState::Unknown(_)
        )
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Paused => write!(f, "paused"),
            ContainerState::Restarting => write!(f, "restarting"),
            ContainerState::Exited { exit_code } => write!(f, "exited ({})", exit_code),
            ContainerState::Removing => write!(f, "removing"),
            ContainerState::Dead => write!(f, "dead"),
            ContainerState::Unknown(s) => write!(f, "unknown: {}", s),
        }
    }
}

/// A resolved reference to an engine-managed container.
///
/// The state is a snapshot taken when the handle was produced; re-resolve the
/// handle by name when a fresh view is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Engine container ID.
    pub id: String,
    /// Container name (the key the engine enforces uniqueness on).
    pub name: String,
    /// State observed at lookup or creation time.
    pub state: ContainerState,
}

/// Result of executing a command in a container.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code of the command.
    pub exit_code: i64,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl ExecResult {
    /// True when the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Image and container operations offered by a container daemon.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Looks an image up by tag.
    ///
    /// `Ok(false)` means the daemon answered that no such image exists; any
    /// failure to get an answer is an error.
    async fn try_image_exists(&self, name: &str) -> Result<bool, DockerError>;

    /// Checks whether an image with the given tag exists in the local store.
    ///
    /// A failed lookup counts as absent.
    async fn image_exists(&self, name: &str) -> bool {
        match self.try_image_exists(name).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(image = %name, error = %e, "Image lookup failed, treating image as absent");
                false
            }
        }
    }

    /// Builds an image tagged `tag` from `context`, using `dockerfile`
    /// (relative to the context root).
    async fn build_image(&self, tag: &str, context: &Path, dockerfile: &str)
        -> Result<(), DockerError>;

    /// Creates, without starting, a container named `name` from `image`.
    async fn create_container(
        &self,
        image: &str,
        name: &str,
        env: &[String],
    ) -> Result<ContainerHandle, DockerError>;

    /// Looks a container up by name.
    ///
    /// Returns [`DockerError::ContainerNotFound`] when no such container exists.
    async fn get_container(&self, name: &str) -> Result<ContainerHandle, DockerError>;

    /// Starts a container.
    async fn start(&self, handle: &ContainerHandle) -> Result<(), DockerError>;

    /// Stops a container.
    async fn stop(&self, handle: &ContainerHandle) -> Result<(), DockerError>;

    /// Runs a command inside a running container and waits for it to finish.
    async fn exec(
        &self,
        handle: &ContainerHandle,
        command: &[String],
    ) -> Result<ExecResult, DockerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_state_from_status() {
        assert_eq!(
            ContainerState::from_status("running", None),
            ContainerState::Running
        );
        assert_eq!(
            ContainerState::from_status("exited", Some(137)),
            ContainerState::Exited { exit_code: 137 }
        );
        assert_eq!(
            ContainerState::from_status("exited", None),
            ContainerState::Exited { exit_code: -1 }
        );
        assert!(matches!(
            ContainerState::from_status("weird", None),
            ContainerState::Unknown(_)
        ));
    }

    #[test]
    fn test_needs_stop() {
        assert!(ContainerState::Running.needs_stop());
        assert!(ContainerState::Paused.needs_stop());
        assert!(!ContainerState::Created.needs_stop());
        assert!(!ContainerState::Exited { exit_code: 0 }.needs_stop());
        assert!(!ContainerState::Dead.needs_stop());
    }

    #[test]
    fn test_container_state_display() {
        assert_eq!(format!("{}", ContainerState::Created), "created");
        assert_eq!(format!("{}", ContainerState::Running), "running");
        assert_eq!(
            format!("{}", ContainerState::Exited { exit_code: 0 }),
            "exited (0)"
        );
        assert_eq!(
            format!("{}", ContainerState::Unknown("x".to_string())),
            "unknown: x"
        );
    }

    #[test]
    fn test_exec_result() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "compiled 3 fuzzers".to_string(),
            stderr: String::new(),
        };
        assert!(result.success());
        assert!(!ExecResult {
            exit_code: 2,
            ..result
        }
        .success());
    }
}

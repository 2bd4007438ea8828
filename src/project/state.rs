//! Observable lifecycle state of a project.

use serde::{Deserialize, Serialize};

use crate::execution::ContainerState;

/// Where a project's container stands, once its image exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPhase {
    Absent,
    Created,
    Running,
    Stopped,
}

impl From<&ContainerState> for ContainerPhase {
    fn from(state: &ContainerState) -> Self {
        match state {
            ContainerState::Created => ContainerPhase::Created,
            ContainerState::Running | ContainerState::Paused | ContainerState::Restarting => {
                ContainerPhase::Running
            }
            ContainerState::Exited { .. }
            | ContainerState::Removing
            | ContainerState::Dead
            | ContainerState::Unknown(_) => ContainerPhase::Stopped,
        }
    }
}

impl std::fmt::Display for ContainerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerPhase::Absent => write!(f, "absent"),
            ContainerPhase::Created => write!(f, "created"),
            ContainerPhase::Running => write!(f, "running"),
            ContainerPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Project state machine position, derived from the engine's stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// No project image in the engine.
    Unbuilt,
    /// Project image present.
    ImageBuilt { container: ContainerPhase },
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectState::Unbuilt => write!(f, "unbuilt"),
            ProjectState::ImageBuilt { container } => {
                write!(f, "image_built (container {})", container)
            }
        }
    }
}

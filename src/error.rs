//! Error types for fuzz-manager operations.
//!
//! Two layers:
//! - [`DockerError`]: failures reported by the container engine client
//! - [`ManagerError`]: the orchestration taxonomy surfaced to the CLI, each
//!   kind carrying its own process exit code

use std::path::PathBuf;

use thiserror::Error;

use crate::project::Language;

/// Errors that can occur during Docker engine operations.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("Docker build failed: {0}")]
    BuildFailed(String),

    #[error("Docker API call '{operation}' failed: {message}")]
    ApiFailed {
        operation: &'static str,
        message: String,
    },

    #[error("Container '{name}' not found")]
    ContainerNotFound { name: String },

    #[error("Docker call '{operation}' timed out after {seconds} seconds")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Docker daemon not available: {0}")]
    DaemonUnavailable(String),

    #[error("Command exited with non-zero code {code}: {stderr}")]
    NonZeroExit { code: i64, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockerError {
    /// Shorthand for an API failure of the named operation.
    pub fn api(operation: &'static str, message: impl ToString) -> Self {
        Self::ApiFailed {
            operation,
            message: message.to_string(),
        }
    }
}

/// Which filesystem prerequisite was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPath {
    ProjectDir,
    Dockerfile,
    BaseImagesDir,
}

impl std::fmt::Display for MissingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingPath::ProjectDir => write!(f, "project directory"),
            MissingPath::Dockerfile => write!(f, "dockerfile"),
            MissingPath::BaseImagesDir => write!(f, "base images directory"),
        }
    }
}

/// Errors surfaced by project and orchestrator operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Invalid project path '{0}': cannot derive a project name")]
    InvalidProject(PathBuf),

    #[error("The specified {what} does not exist: {path}")]
    PathNotFound { what: MissingPath, path: PathBuf },

    #[error("Base image '{image}' for language '{language}' is missing. Run `build_base_images` first")]
    BaseImageMissing { language: Language, image: String },

    #[error("Image build for '{image}' failed: {source}")]
    EngineBuild {
        image: String,
        #[source]
        source: DockerError,
    },

    #[error("Engine call failed: {0}")]
    EngineApi(#[source] DockerError),

    #[error("Container '{name}' does not exist. Run `build_fuzzers` first")]
    ContainerNotFound { name: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ManagerError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            ManagerError::InvalidProject(_) => 2,
            ManagerError::PathNotFound { .. } => 3,
            ManagerError::BaseImageMissing { .. } => 4,
            ManagerError::EngineBuild { .. } => 5,
            ManagerError::EngineApi(_) => 6,
            ManagerError::ContainerNotFound { .. } => 7,
            ManagerError::Config(_) => 8,
        }
    }

    /// Classifies an error returned by an image build call.
    ///
    /// Only failures of the build itself count as build failures; a daemon
    /// that cannot be reached or a call that never answered is an API failure.
    pub fn from_build(image: &str, err: DockerError) -> Self {
        match err {
            DockerError::BuildFailed(_) | DockerError::NonZeroExit { .. } | DockerError::Io(_) => {
                ManagerError::EngineBuild {
                    image: image.to_string(),
                    source: err,
                }
            }
            DockerError::ApiFailed { .. }
            | DockerError::Timeout { .. }
            | DockerError::DaemonUnavailable(_) => ManagerError::EngineApi(err),
            DockerError::ContainerNotFound { name } => ManagerError::ContainerNotFound { name },
        }
    }

    /// Classifies an error returned by a container lifecycle call.
    pub fn from_engine(err: DockerError) -> Self {
        match err {
            DockerError::ContainerNotFound { name } => ManagerError::ContainerNotFound { name },
            DockerError::BuildFailed(_)
            | DockerError::ApiFailed { .. }
            | DockerError::Timeout { .. }
            | DockerError::DaemonUnavailable(_)
            | DockerError::NonZeroExit { .. }
            | DockerError::Io(_) => ManagerError::EngineApi(err),
        }
    }
}

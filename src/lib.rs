//! fuzz-manager: containerized build-and-fuzz workflows.
//!
//! This library builds per-language base images, sanitizer-instrumented
//! project images on top of them, and drives each project's container
//! through its build and fuzzing steps.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod project;
pub mod registry;

// Re-export commonly used types
pub use config::ManagerConfig;
pub use error::{DockerError, ManagerError};
pub use orchestrator::{FuzzManager, ProjectRequest};
pub use project::{Language, Project, ProjectState, Sanitizer};

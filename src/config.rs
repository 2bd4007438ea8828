//! Configuration for fuzz-manager runs.
//!
//! Settings come from an optional YAML file; command-line flags override
//! individual fields. Every field has a default, so an empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ManagerError;
use crate::execution::EngineDeadlines;
use crate::registry::BASE_IMAGES_DIR;

/// Build step executed inside the project container by default.
pub const DEFAULT_BUILD_COMMAND: &str = "compile";

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory holding `base_image_<language>.Dockerfile` files.
    pub base_images_dir: Option<PathBuf>,
    /// Command run inside the container by `build_fuzzers`.
    pub build_command: Vec<String>,
    /// Command run inside the container by `run_fuzzers`.
    pub fuzz_command: Option<Vec<String>>,
    /// Deadlines for engine calls.
    pub engine: EngineDeadlines,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_images_dir: None,
            build_command: vec![DEFAULT_BUILD_COMMAND.to_string()],
            fuzz_command: None,
            engine: EngineDeadlines::default(),
        }
    }
}

impl ManagerConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ManagerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ManagerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            ManagerError::Config(message) => {
                ManagerError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ManagerError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ManagerError::Config(e.to_string()))?;

        if config.build_command.is_empty() {
            return Err(ManagerError::Config(
                "build_command must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Sets the base images directory.
    pub fn with_base_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_images_dir = Some(dir.into());
        self
    }

    /// Sets the in-container build command.
    pub fn with_build_command(mut self, command: Vec<String>) -> Self {
        self.build_command = command;
        self
    }

    /// Sets the in-container fuzz command.
    pub fn with_fuzz_command(mut self, command: Vec<String>) -> Self {
        self.fuzz_command = Some(command);
        self
    }

    /// Sets the deadline for plain engine API calls.
    pub fn with_api_timeout(mut self, seconds: u64) -> Self {
        self.engine.api_timeout_secs = seconds;
        self
    }

    /// Resolves the base images directory.
    ///
    /// Uses the configured directory if any, else `base_images/` next to the
    /// executable when it exists, else `./base_images`.
    pub fn base_images_dir(&self) -> PathBuf {
        if let Some(dir) = &self.base_images_dir {
            return dir.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(BASE_IMAGES_DIR)))
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(|| PathBuf::from(BASE_IMAGES_DIR))
    }
}

//! Command-level workflows composed from project lifecycle operations.
//!
//! Each [`FuzzManager`] method is one CLI intent. It builds fresh
//! [`Project`] views and relies on their idempotent operations instead of
//! tracking state between runs.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::execution::ContainerEngine;
use crate::project::{Language, Project, ProjectState, Sanitizer, DEFAULT_DOCKERFILE};
use crate::registry::BaseImageRegistry;

/// The project a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRequest {
    pub path: PathBuf,
    pub language: Language,
    pub dockerfile: String,
    pub sanitizer: Sanitizer,
}

impl ProjectRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            language: Language::default(),
            dockerfile: DEFAULT_DOCKERFILE.to_string(),
            sanitizer: Sanitizer::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = dockerfile.into();
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }
}

/// Runs fuzz-manager commands against one engine.
pub struct FuzzManager {
    engine: Arc<dyn ContainerEngine>,
    config: ManagerConfig,
}

impl FuzzManager {
    pub fn new(engine: Arc<dyn ContainerEngine>, config: ManagerConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> BaseImageRegistry {
        BaseImageRegistry::new(self.engine.clone(), self.config.base_images_dir())
    }

    fn project(&self, request: &ProjectRequest) -> Result<Project, ManagerError> {
        Ok(Project::new(
            self.engine.clone(),
            &request.path,
            request.language,
            request.dockerfile.clone(),
        )?
        .with_sanitizer(request.sanitizer))
    }

    /// Builds base images, all of them or only `only`'s.
    pub async fn build_base_images(
        &self,
        only: Option<Language>,
    ) -> Result<Vec<Language>, ManagerError> {
        self.registry().build_base_images(only).await
    }

    /// Builds the project image.
    pub async fn build_project_image(&self, request: &ProjectRequest) -> Result<(), ManagerError> {
        self.project(request)?.build_project_image().await
    }

    /// Builds the project's fuzzers inside its container.
    ///
    /// Image build, container create, start, build command, stop. The
    /// container is stopped even when the build command fails.
    #[instrument(skip(self, request), fields(path = %request.path.display(), sanitizer = %request.sanitizer))]
    pub async fn build_fuzzers(&self, request: &ProjectRequest) -> Result<(), ManagerError> {
        let mut project = self.project(request)?;

        project.build_project_image().await?;
        let env = project.container_env();
        project.create_container(&env).await?;
        project.start_container().await?;

        let built = project
            .exec_in_container(&self.config.build_command)
            .await
            .map(|_| ());
        let stopped = project.stop_container().await;
        built?;
        stopped?;

        info!(project = %project.name(), "Fuzzers built successfully");
        Ok(())
    }

    /// Runs the fuzzers in the container left by `build_fuzzers`.
    ///
    /// Never creates a container: without one this fails with
    /// `ContainerNotFound`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn run_fuzzers(&self, path: &std::path::Path) -> Result<(), ManagerError> {
        let mut project = self.project(&ProjectRequest::new(path))?;

        if !project.is_container_created().await? {
            error!(
                container = %project.container_name(),
                "Container does not exist. Run `build_fuzzers` first"
            );
            return Err(ManagerError::ContainerNotFound {
                name: project.container_name().to_string(),
            });
        }

        project.start_container().await?;
        let fuzzed = project
            .run_fuzzers(self.config.fuzz_command.as_deref())
            .await;
        let stopped = project.stop_container().await;
        fuzzed?;
        stopped?;

        Ok(())
    }

    /// Reports the project's lifecycle state.
    pub async fn status(&self, path: &std::path::Path) -> Result<ProjectState, ManagerError> {
        self.project(&ProjectRequest::new(path))?.state().await
    }
}

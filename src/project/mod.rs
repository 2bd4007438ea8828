//! Project container lifecycle.
//!
//! A [`Project`] bundles a project directory with its language and the names
//! derived from it, and drives its image and container through the engine:
//!
//! ```text
//! UNBUILT → IMAGE_BUILT → container ABSENT | CREATED | RUNNING | STOPPED
//! ```
//!
//! Every lifecycle operation succeeds without touching the engine when its
//! target state is already reached. The engine's name-keyed store is the
//! record of truth; a `Project` only caches what it learned during one
//! command invocation.

pub mod state;
pub mod types;

pub use state::{ContainerPhase, ProjectState};
pub use types::{Language, Sanitizer};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::error::{DockerError, ManagerError, MissingPath};
use crate::execution::{ContainerEngine, ContainerHandle, ContainerState, ExecResult};
use crate::registry;

/// Dockerfile name used when none is given.
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Environment variable carrying the sanitizer into the container.
pub const SANITIZER_ENV: &str = "SANITIZER";

/// A fuzzing target and its engine-side image and container.
pub struct Project {
    engine: Arc<dyn ContainerEngine>,
    path: PathBuf,
    name: String,
    image_name: String,
    container_name: String,
    language: Language,
    dockerfile: String,
    sanitizer: Sanitizer,
    /// Set once this instance built the image.
    image_built: bool,
    /// Handle from the last successful lookup or create.
    container: Option<ContainerHandle>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("language", &self.language)
            .field("dockerfile", &self.dockerfile)
            .field("sanitizer", &self.sanitizer)
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Creates a project view over `path`.
    ///
    /// The project name is the last path component; trailing separators are
    /// ignored. Fails with `InvalidProject` when the path has no such
    /// component (e.g. `/` or `..`).
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        path: impl Into<PathBuf>,
        language: Language,
        dockerfile: impl Into<String>,
    ) -> Result<Self, ManagerError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ManagerError::InvalidProject(path.clone()))?;

        Ok(Self {
            engine,
            image_name: format!("{name}_image"),
            container_name: format!("{name}_fuzz"),
            name,
            path,
            language,
            dockerfile: dockerfile.into(),
            sanitizer: Sanitizer::default(),
            image_built: false,
            container: None,
        })
    }

    /// Sets the sanitizer handed to the build step.
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn dockerfile(&self) -> &str {
        &self.dockerfile
    }

    pub fn sanitizer(&self) -> Sanitizer {
        self.sanitizer
    }

    /// Environment for the project container, e.g. `SANITIZER=address`.
    pub fn container_env(&self) -> Vec<String> {
        vec![format!("{SANITIZER_ENV}={}", self.sanitizer)]
    }

    /// Builds the project image from the project directory.
    ///
    /// Requires the language's base image, the project directory and the
    /// dockerfile at its root. An existing image with the same tag is
    /// replaced.
    #[instrument(skip(self), fields(project = %self.name, image = %self.image_name))]
    pub async fn build_project_image(&mut self) -> Result<(), ManagerError> {
        if !registry::base_image_ready(self.engine.as_ref(), self.language).await? {
            let image = self.language.base_image_name();
            error!(base_image = %image, "Base image should be built first. Run `build_base_images`");
            return Err(ManagerError::BaseImageMissing {
                language: self.language,
                image,
            });
        }

        if !self.path.is_dir() {
            error!(path = %self.path.display(), "The specified path for the project does not exist");
            return Err(ManagerError::PathNotFound {
                what: MissingPath::ProjectDir,
                path: self.path.clone(),
            });
        }

        let dockerfile_path = self.path.join(&self.dockerfile);
        if !dockerfile_path.is_file() {
            error!(path = %dockerfile_path.display(), "The specified path for the dockerfile does not exist");
            return Err(ManagerError::PathNotFound {
                what: MissingPath::Dockerfile,
                path: dockerfile_path,
            });
        }

        info!("Building project image...");
        if let Err(e) = self
            .engine
            .build_image(&self.image_name, &self.path, &self.dockerfile)
            .await
        {
            error!(error = %e, "Docker build failed");
            return Err(ManagerError::from_build(&self.image_name, e));
        }

        self.image_built = true;
        info!("Docker image for the project built successfully");
        Ok(())
    }

    /// Reports whether the project container exists, caching its handle.
    ///
    /// A cached handle answers without a lookup; otherwise the container is
    /// looked up by name.
    pub async fn is_container_created(&mut self) -> Result<bool, ManagerError> {
        Ok(self.resolve_container().await?.is_some())
    }

    /// Creates the project container, not yet started.
    ///
    /// Builds the image first if this instance has not built it and the engine
    /// does not have it. An existing container with the project's name is
    /// reused as is, including the environment it was created with.
    #[instrument(skip(self, env), fields(project = %self.name, container = %self.container_name))]
    pub async fn create_container(
        &mut self,
        env: &[String],
    ) -> Result<ContainerHandle, ManagerError> {
        if !self.image_built && !self.project_image_exists().await? {
            info!("Project image is missing, building it first");
            self.build_project_image().await?;
        }

        if let Some(handle) = self.resolve_container().await? {
            info!(id = %handle.id, state = %handle.state, "Container already exists, reusing it");
            return Ok(handle);
        }

        let handle = self
            .engine
            .create_container(&self.image_name, &self.container_name, env)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not create docker container");
                ManagerError::from_engine(e)
            })?;

        info!(id = %handle.id, "Docker container created successfully");
        self.container = Some(handle.clone());
        Ok(handle)
    }

    /// Starts the project container; a running container is left alone.
    #[instrument(skip(self), fields(project = %self.name, container = %self.container_name))]
    pub async fn start_container(&mut self) -> Result<(), ManagerError> {
        let Some(handle) = self.refresh_container().await? else {
            error!("Container does not exist");
            return Err(self.container_not_found());
        };

        if handle.state.is_running() {
            debug!("Container is already running");
            return Ok(());
        }

        // The daemon refuses to start a paused container.
        if handle.state == ContainerState::Paused {
            error!("Container is paused, unpause it before starting");
            return Err(ManagerError::EngineApi(DockerError::api(
                "start_container",
                format!("container {} is paused; unpause it first", handle.name),
            )));
        }

        self.engine.start(&handle).await.map_err(|e| {
            error!(error = %e, "Could not start docker container");
            ManagerError::from_engine(e)
        })?;

        self.container = None;
        info!("Docker container started successfully");
        Ok(())
    }

    /// Stops the project container.
    ///
    /// An absent, created-but-never-started or exited container counts as
    /// stopped.
    #[instrument(skip(self), fields(project = %self.name, container = %self.container_name))]
    pub async fn stop_container(&mut self) -> Result<(), ManagerError> {
        let Some(handle) = self.refresh_container().await? else {
            debug!("Container does not exist, nothing to stop");
            return Ok(());
        };

        if !handle.state.needs_stop() {
            debug!(state = %handle.state, "Container is already stopped");
            return Ok(());
        }

        match self.engine.stop(&handle).await {
            Ok(()) => {}
            Err(DockerError::ContainerNotFound { .. }) => {
                warn!("Container disappeared while stopping it");
            }
            Err(e) => {
                error!(error = %e, "Could not stop docker container");
                return Err(ManagerError::from_engine(e));
            }
        }

        self.container = None;
        info!("Docker container stopped");
        Ok(())
    }

    /// Runs `command` inside the running project container.
    ///
    /// A non-zero exit status is a failure. The container is left running
    /// either way.
    #[instrument(skip(self), fields(project = %self.name, container = %self.container_name))]
    pub async fn exec_in_container(
        &mut self,
        command: &[String],
    ) -> Result<ExecResult, ManagerError> {
        let Some(handle) = self.refresh_container().await? else {
            error!("Container does not exist");
            return Err(self.container_not_found());
        };

        if !handle.state.is_running() {
            error!(state = %handle.state, "Container is not running");
            return Err(ManagerError::EngineApi(DockerError::api(
                "exec",
                format!("container {} is {}", handle.name, handle.state),
            )));
        }

        info!(command = %command.join(" "), "Executing command in container");
        let result = self.engine.exec(&handle, command).await.map_err(|e| {
            error!(error = %e, "Command execution failed");
            ManagerError::from_engine(e)
        })?;

        if !result.success() {
            error!(exit_code = result.exit_code, stderr = %result.stderr.trim_end(), "Command failed");
            return Err(ManagerError::EngineApi(DockerError::NonZeroExit {
                code: result.exit_code,
                stderr: result.stderr,
            }));
        }

        Ok(result)
    }

    /// Runs the fuzzing harness inside the running container.
    ///
    /// With no harness command configured this only logs.
    #[instrument(skip(self, command), fields(project = %self.name))]
    pub async fn run_fuzzers(&mut self, command: Option<&[String]>) -> Result<(), ManagerError> {
        match command {
            Some(command) if !command.is_empty() => {
                self.exec_in_container(command).await?;
                info!("Fuzzers finished");
            }
            _ => info!("No fuzz command configured, skipping fuzzer run"),
        }
        Ok(())
    }

    /// Derives the project's state from the engine without changing anything.
    pub async fn state(&mut self) -> Result<ProjectState, ManagerError> {
        if !self.project_image_exists().await? {
            return Ok(ProjectState::Unbuilt);
        }

        let container = match self.refresh_container().await? {
            Some(handle) => ContainerPhase::from(&handle.state),
            None => ContainerPhase::Absent,
        };
        Ok(ProjectState::ImageBuilt { container })
    }

    async fn project_image_exists(&self) -> Result<bool, ManagerError> {
        self.engine
            .try_image_exists(&self.image_name)
            .await
            .map_err(|e| {
                error!(image = %self.image_name, error = %e, "Image lookup failed");
                ManagerError::from_engine(e)
            })
    }

    async fn resolve_container(&mut self) -> Result<Option<ContainerHandle>, ManagerError> {
        if let Some(handle) = &self.container {
            return Ok(Some(handle.clone()));
        }

        match self.engine.get_container(&self.container_name).await {
            Ok(handle) => {
                self.container = Some(handle.clone());
                Ok(Some(handle))
            }
            Err(DockerError::ContainerNotFound { .. }) => Ok(None),
            Err(e) => {
                error!(container = %self.container_name, error = %e, "Container lookup failed");
                Err(ManagerError::from_engine(e))
            }
        }
    }

    /// Drops the cached handle and looks the container up again.
    async fn refresh_container(&mut self) -> Result<Option<ContainerHandle>, ManagerError> {
        self.container = None;
        self.resolve_container().await
    }

    fn container_not_found(&self) -> ManagerError {
        ManagerError::ContainerNotFound {
            name: self.container_name.clone(),
        }
    }
}

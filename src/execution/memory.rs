//! In-memory container engine.
//!
//! Models the daemon's name-keyed image and container stores without touching
//! Docker. Every mutating call is recorded, and individual operations can be
//! made to fail, so lifecycle rules can be checked call by call.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::DockerError;
use crate::execution::container::{ContainerEngine, ContainerHandle, ContainerState, ExecResult};

/// Engine operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ImageLookup,
    BuildImage,
    CreateContainer,
    GetContainer,
    Start,
    Stop,
    Exec,
}

/// A mutating call received by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    BuildImage { tag: String, dockerfile: String },
    CreateContainer { name: String, image: String, env: Vec<String> },
    Start { name: String },
    Stop { name: String },
    Exec { name: String, command: Vec<String> },
}

#[derive(Debug, Clone)]
struct StoredContainer {
    id: String,
    image: String,
    env: Vec<String>,
    state: ContainerState,
}

#[derive(Debug, Default)]
struct EngineState {
    images: HashSet<String>,
    containers: HashMap<String, StoredContainer>,
    calls: Vec<EngineCall>,
    failures: HashSet<Operation>,
    exec_exit_code: i64,
    next_id: u64,
}

/// A [`ContainerEngine`] backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    /// Creates an engine with empty image and container stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pre-existing image.
    pub fn with_image(self, tag: impl Into<String>) -> Self {
        self.lock().images.insert(tag.into());
        self
    }

    /// Makes every subsequent call of `operation` fail.
    pub fn fail_on(&self, operation: Operation) {
        self.lock().failures.insert(operation);
    }

    /// Sets the exit code returned by subsequent exec calls.
    pub fn set_exec_exit_code(&self, code: i64) {
        self.lock().exec_exit_code = code;
    }

    /// Changes a container's state behind the caller's back, as another
    /// process talking to the daemon would.
    pub fn set_container_state(&self, name: &str, state: ContainerState) {
        if let Some(container) = self.lock().containers.get_mut(name) {
            container.state = state;
        }
    }

    /// Deletes a container out of band.
    pub fn remove_container(&self, name: &str) {
        self.lock().containers.remove(name);
    }

    pub fn has_image(&self, tag: &str) -> bool {
        self.lock().images.contains(tag)
    }

    pub fn container_state(&self, name: &str) -> Option<ContainerState> {
        self.lock().containers.get(name).map(|c| c.state.clone())
    }

    pub fn container_env(&self, name: &str) -> Option<Vec<String>> {
        self.lock().containers.get(name).map(|c| c.env.clone())
    }

    pub fn container_image(&self, name: &str) -> Option<String> {
        self.lock().containers.get(name).map(|c| c.image.clone())
    }

    /// All mutating calls received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EngineState {
    fn check(&self, operation: Operation) -> Result<(), DockerError> {
        if self.failures.contains(&operation) {
            return Err(match operation {
                Operation::ImageLookup => DockerError::api("inspect_image", "injected failure"),
                Operation::BuildImage => DockerError::BuildFailed("injected failure".to_string()),
                Operation::CreateContainer => DockerError::api("create_container", "injected failure"),
                Operation::GetContainer => DockerError::api("inspect_container", "injected failure"),
                Operation::Start => DockerError::api("start_container", "injected failure"),
                Operation::Stop => DockerError::api("stop_container", "injected failure"),
                Operation::Exec => DockerError::api("exec", "injected failure"),
            });
        }
        Ok(())
    }

    fn container(&self, handle: &ContainerHandle) -> Result<&StoredContainer, DockerError> {
        self.containers
            .get(&handle.name)
            .filter(|c| c.id == handle.id)
            .ok_or_else(|| DockerError::ContainerNotFound {
                name: handle.name.clone(),
            })
    }

    fn container_mut(
        &mut self,
        handle: &ContainerHandle,
    ) -> Result<&mut StoredContainer, DockerError> {
        self.containers
            .get_mut(&handle.name)
            .filter(|c| c.id == handle.id)
            .ok_or_else(|| DockerError::ContainerNotFound {
                name: handle.name.clone(),
            })
    }
}

#[async_trait]
impl ContainerEngine for InMemoryEngine {
    async fn try_image_exists(&self, name: &str) -> Result<bool, DockerError> {
        let state = self.lock();
        state.check(Operation::ImageLookup)?;
        Ok(state.images.contains(name))
    }

    async fn build_image(
        &self,
        tag: &str,
        context: &Path,
        dockerfile: &str,
    ) -> Result<(), DockerError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::BuildImage {
            tag: tag.to_string(),
            dockerfile: dockerfile.to_string(),
        });
        state.check(Operation::BuildImage)?;

        if !context.join(dockerfile).is_file() {
            return Err(DockerError::BuildFailed(format!(
                "Cannot locate specified Dockerfile: {dockerfile}"
            )));
        }

        state.images.insert(tag.to_string());
        Ok(())
    }

    async fn create_container(
        &self,
        image: &str,
        name: &str,
        env: &[String],
    ) -> Result<ContainerHandle, DockerError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::CreateContainer {
            name: name.to_string(),
            image: image.to_string(),
            env: env.to_vec(),
        });
        state.check(Operation::CreateContainer)?;

        if state.containers.contains_key(name) {
            return Err(DockerError::api(
                "create_container",
                format!("Conflict. The container name \"/{name}\" is already in use"),
            ));
        }
        if !state.images.contains(image) {
            return Err(DockerError::api(
                "create_container",
                format!("No such image: {image}"),
            ));
        }

        state.next_id += 1;
        let id = format!("{:012x}", state.next_id);
        state.containers.insert(
            name.to_string(),
            StoredContainer {
                id: id.clone(),
                image: image.to_string(),
                env: env.to_vec(),
                state: ContainerState::Created,
            },
        );

        Ok(ContainerHandle {
            id,
            name: name.to_string(),
            state: ContainerState::Created,
        })
    }

    async fn get_container(&self, name: &str) -> Result<ContainerHandle, DockerError> {
        let state = self.lock();
        state.check(Operation::GetContainer)?;

        state
            .containers
            .get(name)
            .map(|c| ContainerHandle {
                id: c.id.clone(),
                name: name.to_string(),
                state: c.state.clone(),
            })
            .ok_or_else(|| DockerError::ContainerNotFound {
                name: name.to_string(),
            })
    }

    async fn start(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Start {
            name: handle.name.clone(),
        });
        state.check(Operation::Start)?;

        state.container_mut(handle)?.state = ContainerState::Running;
        Ok(())
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Stop {
            name: handle.name.clone(),
        });
        state.check(Operation::Stop)?;

        state.container_mut(handle)?.state = ContainerState::Exited { exit_code: 0 };
        Ok(())
    }

    async fn exec(
        &self,
        handle: &ContainerHandle,
        command: &[String],
    ) -> Result<ExecResult, DockerError> {
        let mut state = self.lock();
        state.calls.push(EngineCall::Exec {
            name: handle.name.clone(),
            command: command.to_vec(),
        });
        state.check(Operation::Exec)?;

        if !state.container(handle)?.state.is_running() {
            return Err(DockerError::api(
                "create_exec",
                format!("Container {} is not running", handle.name),
            ));
        }

        let exit_code = state.exec_exit_code;
        Ok(ExecResult {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{} exited with {exit_code}", command.join(" "))
            },
        })
    }
}

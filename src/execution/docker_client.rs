//! Docker API wrapper using the bollard crate.
//!
//! [`DockerClient`] implements [`ContainerEngine`] against the local Docker
//! daemon. Every call is bounded by a deadline from [`EngineDeadlines`].

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::BuildImageOptions;
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::error::DockerError;
use crate::execution::container::{ContainerEngine, ContainerHandle, ContainerState, ExecResult};
use crate::execution::deadlines::EngineDeadlines;

/// Docker client wrapper for image and container operations.
pub struct DockerClient {
    docker: Docker,
    deadlines: EngineDeadlines,
}

impl DockerClient {
    /// Creates a new Docker client connecting to the local Docker daemon.
    ///
    /// # Errors
    ///
    /// Returns `DockerError::DaemonUnavailable` if the Docker daemon is not accessible.
    pub fn new(deadlines: EngineDeadlines) -> Result<Self, DockerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| DockerError::DaemonUnavailable(format!("Failed to connect: {e}")))?;

        Ok(Self { docker, deadlines })
    }

    /// Creates a new Docker client from an existing bollard Docker instance.
    pub fn from_docker(docker: Docker, deadlines: EngineDeadlines) -> Self {
        Self { docker, deadlines }
    }
}

/// Runs `call`, failing with `DockerError::Timeout` once `limit` elapses.
async fn with_deadline<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, DockerError>
where
    F: Future<Output = Result<T, DockerError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DockerError::Timeout {
            operation,
            seconds: limit.as_secs(),
        }),
    }
}

fn status_code(err: &BollardError) -> Option<u16> {
    match err {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn is_not_found(err: &BollardError) -> bool {
    status_code(err) == Some(404)
}

/// 304: the container was already in the requested state.
fn is_not_modified(err: &BollardError) -> bool {
    status_code(err) == Some(304)
}

/// Packs a build context directory into an uncompressed tar archive.
///
/// Symlinks are stored as links, never followed.
fn context_archive(context: &Path) -> Result<Vec<u8>, DockerError> {
    let mut archive = tar::Builder::new(Vec::new());
    archive.follow_symlinks(false);
    archive.append_dir_all(".", context)?;
    Ok(archive.into_inner()?)
}

#[async_trait]
impl ContainerEngine for DockerClient {
    async fn try_image_exists(&self, name: &str) -> Result<bool, DockerError> {
        with_deadline("inspect_image", self.deadlines.api(), async {
            match self.docker.inspect_image(name).await {
                Ok(_) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(DockerError::api("inspect_image", e)),
            }
        })
        .await
    }

    async fn build_image(
        &self,
        tag: &str,
        context: &Path,
        dockerfile: &str,
    ) -> Result<(), DockerError> {
        let archive = context_archive(context)?;
        let options = BuildImageOptions {
            dockerfile: dockerfile.to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        with_deadline("build_image", self.deadlines.build(), async {
            let mut stream = self.docker.build_image(options, None, Some(archive.into()));

            while let Some(item) = stream.next().await {
                let info = item.map_err(|e| match e {
                    BollardError::DockerResponseServerError { message, .. } => {
                        DockerError::BuildFailed(message)
                    }
                    other => DockerError::api("build_image", other),
                })?;

                if let Some(message) = info.error {
                    error!(image = %tag, "{}", message.trim_end());
                    return Err(DockerError::BuildFailed(message));
                }
                if let Some(line) = info.stream {
                    let line = line.trim_end();
                    if !line.is_empty() {
                        debug!(image = %tag, "{line}");
                    }
                }
            }

            Ok(())
        })
        .await
    }

    async fn create_container(
        &self,
        image: &str,
        name: &str,
        env: &[String],
    ) -> Result<ContainerHandle, DockerError> {
        // A TTY with open stdin keeps the image's default shell alive for exec.
        let container_config = Config {
            image: Some(image.to_string()),
            env: if env.is_empty() {
                None
            } else {
                Some(env.to_vec())
            },
            tty: Some(true),
            open_stdin: Some(true),
            attach_stdin: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        let response = with_deadline("create_container", self.deadlines.api(), async {
            self.docker
                .create_container(Some(options), container_config)
                .await
                .map_err(|e| DockerError::api("create_container", e))
        })
        .await?;

        for warning in &response.warnings {
            warn!(container = %name, "{warning}");
        }

        Ok(ContainerHandle {
            id: response.id,
            name: name.to_string(),
            state: ContainerState::Created,
        })
    }

    async fn get_container(&self, name: &str) -> Result<ContainerHandle, DockerError> {
        let info = with_deadline("inspect_container", self.deadlines.api(), async {
            self.docker
                .inspect_container(name, None::<InspectContainerOptions>)
                .await
                .map_err(|e| {
                    if is_not_found(&e) {
                        DockerError::ContainerNotFound {
                            name: name.to_string(),
                        }
                    } else {
                        DockerError::api("inspect_container", e)
                    }
                })
        })
        .await?;

        let state = info
            .state
            .ok_or_else(|| DockerError::api("inspect_container", "container has no state"))?;
        let status = state.status.map(|s| s.to_string()).unwrap_or_default();

        Ok(ContainerHandle {
            id: info.id.unwrap_or_else(|| name.to_string()),
            name: name.to_string(),
            state: ContainerState::from_status(&status, state.exit_code),
        })
    }

    async fn start(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        with_deadline("start_container", self.deadlines.api(), async {
            match self
                .docker
                .start_container(&handle.id, None::<StartContainerOptions<String>>)
                .await
            {
                Ok(()) => Ok(()),
                Err(e) if is_not_modified(&e) => Ok(()),
                Err(e) if is_not_found(&e) => Err(DockerError::ContainerNotFound {
                    name: handle.name.clone(),
                }),
                Err(e) => Err(DockerError::api("start_container", e)),
            }
        })
        .await
    }

    /// Sends SIGTERM and lets the daemon wait `stop_grace_secs` before SIGKILL.
    async fn stop(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let options = StopContainerOptions {
            t: i64::try_from(self.deadlines.stop_grace_secs).unwrap_or(i64::MAX),
        };

        with_deadline("stop_container", self.deadlines.stop(), async {
            match self.docker.stop_container(&handle.id, Some(options)).await {
                Ok(()) => Ok(()),
                Err(e) if is_not_modified(&e) => Ok(()),
                Err(e) if is_not_found(&e) => Err(DockerError::ContainerNotFound {
                    name: handle.name.clone(),
                }),
                Err(e) => Err(DockerError::api("stop_container", e)),
            }
        })
        .await
    }

    async fn exec(
        &self,
        handle: &ContainerHandle,
        command: &[String],
    ) -> Result<ExecResult, DockerError> {
        let exec_options = CreateExecOptions {
            cmd: Some(command.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        with_deadline("exec", self.deadlines.exec(), async {
            let exec = self
                .docker
                .create_exec(&handle.id, exec_options)
                .await
                .map_err(|e| DockerError::api("create_exec", e))?;

            let start_result = self
                .docker
                .start_exec(&exec.id, None)
                .await
                .map_err(|e| DockerError::api("start_exec", e))?;

            let mut stdout = String::new();
            let mut stderr = String::new();

            if let StartExecResults::Attached { mut output, .. } = start_result {
                while let Some(chunk) = output.next().await {
                    match chunk {
                        Ok(LogOutput::StdOut { message }) => {
                            let text = String::from_utf8_lossy(&message);
                            debug!(container = %handle.name, "{}", text.trim_end());
                            stdout.push_str(&text);
                        }
                        Ok(LogOutput::StdErr { message }) => {
                            let text = String::from_utf8_lossy(&message);
                            debug!(container = %handle.name, "{}", text.trim_end());
                            stderr.push_str(&text);
                        }
                        Ok(_) => {}
                        Err(e) => return Err(DockerError::api("exec_output", e)),
                    }
                }
            }

            let exec_info = self
                .docker
                .inspect_exec(&exec.id)
                .await
                .map_err(|e| DockerError::api("inspect_exec", e))?;

            Ok(ExecResult {
                exit_code: exec_info.exit_code.unwrap_or(-1),
                stdout,
                stderr,
            })
        })
        .await
    }
}

//! Container engine layer for fuzz-manager.
//!
//! [`ContainerEngine`] is the capability the rest of the crate talks to.
//! [`DockerClient`] implements it with the bollard crate against the local
//! daemon; [`InMemoryEngine`] implements it over in-process maps.
//!
//! # Architecture
//!
//! Container states as reported by the engine:
//! ```text
//! absent → created → running → exited
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fuzz_manager::execution::{ContainerEngine, DockerClient, EngineDeadlines};
//!
//! let client = DockerClient::new(EngineDeadlines::default())?;
//! let handle = client.create_container("foo_image", "foo_fuzz", &[]).await?;
//! client.start(&handle).await?;
//! client.exec(&handle, &["compile".to_string()]).await?;
//! client.stop(&handle).await?;
//! ```

pub mod container;
pub mod deadlines;
pub mod docker_client;
pub mod memory;

pub use container::{ContainerEngine, ContainerHandle, ContainerState, ExecResult};
pub use deadlines::EngineDeadlines;
pub use docker_client::DockerClient;
pub use memory::{EngineCall, InMemoryEngine, Operation};

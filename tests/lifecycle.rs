//! End-to-end workflow tests against the in-memory engine.
//!
//! Each test drives `FuzzManager` the way the CLI does and then inspects the
//! engine's stores and call log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fuzz_manager::cli::{run_command, Cli};
use fuzz_manager::execution::{ContainerState, EngineCall, InMemoryEngine, Operation};
use fuzz_manager::project::ContainerPhase;
use fuzz_manager::{FuzzManager, Language, ManagerConfig, ManagerError, ProjectRequest, ProjectState};

use clap::Parser;

/// Creates `<root>/<name>/`, optionally with a Dockerfile.
fn project_dir(root: &Path, name: &str, with_dockerfile: bool) -> PathBuf {
    let path = root.join(name);
    std::fs::create_dir_all(&path).expect("mkdir");
    if with_dockerfile {
        std::fs::write(
            path.join("Dockerfile"),
            "FROM base_image_c\nCOPY . /src\n",
        )
        .expect("write");
    }
    path
}

fn base_images_dir(root: &Path) -> PathBuf {
    let dir = root.join("base_images");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join("base_image_c.Dockerfile"), "FROM ubuntu:22.04\n").expect("write");
    std::fs::write(dir.join("base_image_go.Dockerfile"), "FROM golang:1.22\n").expect("write");
    dir
}

fn manager(engine: &Arc<InMemoryEngine>, root: &Path) -> FuzzManager {
    let config = ManagerConfig::default().with_base_images_dir(base_images_dir(root));
    FuzzManager::new(engine.clone(), config)
}

#[tokio::test]
async fn test_build_fuzzers_full_pipeline() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));

    manager(&engine, root.path())
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .expect("build_fuzzers");

    assert!(engine.has_image("foo_image"));
    assert_eq!(
        engine.container_state("foo_fuzz"),
        Some(ContainerState::Exited { exit_code: 0 })
    );
    assert_eq!(
        engine.container_env("foo_fuzz"),
        Some(vec!["SANITIZER=address".to_string()])
    );
    assert_eq!(engine.container_image("foo_fuzz").as_deref(), Some("foo_image"));

    let calls = engine.calls();
    assert_eq!(
        calls,
        vec![
            EngineCall::BuildImage {
                tag: "foo_image".to_string(),
                dockerfile: "Dockerfile".to_string(),
            },
            EngineCall::CreateContainer {
                name: "foo_fuzz".to_string(),
                image: "foo_image".to_string(),
                env: vec!["SANITIZER=address".to_string()],
            },
            EngineCall::Start {
                name: "foo_fuzz".to_string(),
            },
            EngineCall::Exec {
                name: "foo_fuzz".to_string(),
                command: vec!["compile".to_string()],
            },
            EngineCall::Stop {
                name: "foo_fuzz".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_build_fuzzers_without_dockerfile() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", false);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));

    let err = manager(&engine, root.path())
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::PathNotFound { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(engine.container_state("foo_fuzz").is_none());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_build_fuzzers_twice_reuses_container() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));
    let manager = manager(&engine, root.path());

    manager
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .expect("first build");
    manager
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .expect("second build");

    let calls = engine.calls();
    let creates = calls
        .iter()
        .filter(|c| matches!(c, EngineCall::CreateContainer { .. }))
        .count();
    let builds = calls
        .iter()
        .filter(|c| matches!(c, EngineCall::BuildImage { .. }))
        .count();
    assert_eq!(creates, 1);
    assert_eq!(builds, 2);
}

#[tokio::test]
async fn test_build_project_image_requires_base_image() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);

    for language in Language::ALL {
        let engine = Arc::new(InMemoryEngine::new());
        let err = manager(&engine, root.path())
            .build_project_image(&ProjectRequest::new(&path).with_language(language))
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::BaseImageMissing { .. }));
        assert_eq!(err.exit_code(), 4);
        assert!(!engine.has_image("foo_image"));
    }
}

#[tokio::test]
async fn test_run_fuzzers_without_container() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "bar", true);
    let engine = Arc::new(
        InMemoryEngine::new()
            .with_image("base_image_c")
            .with_image("bar_image"),
    );

    let err = manager(&engine, root.path())
        .run_fuzzers(&path)
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::ContainerNotFound { ref name } if name == "bar_fuzz"));
    assert_eq!(err.exit_code(), 7);
    assert!(engine.container_state("bar_fuzz").is_none());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_run_fuzzers_after_build_fuzzers() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));
    let manager = manager(&engine, root.path());

    manager
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .expect("build_fuzzers");
    manager.run_fuzzers(&path).await.expect("run_fuzzers");

    let calls = engine.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            EngineCall::Start {
                name: "foo_fuzz".to_string(),
            },
            EngineCall::Stop {
                name: "foo_fuzz".to_string(),
            },
        ]
    );
    assert_eq!(
        manager.status(&path).await.expect("status"),
        ProjectState::ImageBuilt {
            container: ContainerPhase::Stopped
        }
    );
}

#[tokio::test]
async fn test_build_base_images_only_go() {
    let root = tempfile::tempdir().expect("tempdir");
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));

    let built = manager(&engine, root.path())
        .build_base_images(Some(Language::Go))
        .await
        .expect("build");

    assert_eq!(built, vec![Language::Go]);
    assert!(engine.has_image("base_image_go"));
    assert_eq!(
        engine.calls(),
        vec![EngineCall::BuildImage {
            tag: "base_image_go".to_string(),
            dockerfile: "base_image_go.Dockerfile".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_engine_start_failure_is_reported() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));
    engine.fail_on(Operation::Start);

    let err = manager(&engine, root.path())
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::EngineApi(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(
        engine.container_state("foo_fuzz"),
        Some(ContainerState::Created)
    );
}

#[tokio::test]
async fn test_cli_commands_drive_the_manager() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new());
    let manager = manager(&engine, root.path());
    let project = path.to_string_lossy().into_owned();
    let project = project.as_str();

    for args in [
        vec!["fuzz-manager", "build_base_images", "--only", "c"],
        vec!["fuzz-manager", "build_fuzzers", project, "--sanitizer", "coverage"],
        vec!["fuzz-manager", "run_fuzzers", project],
        vec!["fuzz-manager", "status", project],
    ] {
        let cli = Cli::try_parse_from(args).expect("parse");
        run_command(&manager, cli.command).await.expect("command");
    }

    assert!(engine.has_image("base_image_c"));
    assert!(!engine.has_image("base_image_go"));
    assert_eq!(
        engine.container_env("foo_fuzz"),
        Some(vec!["SANITIZER=coverage".to_string()])
    );
}

#[tokio::test]
async fn test_unreachable_daemon_is_not_reported_as_missing_base_image() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = project_dir(root.path(), "foo", true);
    let engine = Arc::new(InMemoryEngine::new().with_image("base_image_c"));
    engine.fail_on(Operation::ImageLookup);

    let err = manager(&engine, root.path())
        .build_fuzzers(&ProjectRequest::new(&path))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::EngineApi(_)));
    assert_eq!(err.exit_code(), 6);
    assert!(engine.calls().is_empty());
}

//! CLI command definitions for fuzz-manager.
//!
//! Each subcommand maps onto one [`FuzzManager`] workflow.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::execution::{ContainerEngine, DockerClient};
use crate::orchestrator::{FuzzManager, ProjectRequest};
use crate::project::{Language, Sanitizer, DEFAULT_DOCKERFILE};

/// Manager of the fuzzing process.
#[derive(Parser, Debug)]
#[command(name = "fuzz-manager")]
#[command(about = "Manager of the fuzzing process")]
#[command(version)]
#[command(
    long_about = "fuzz-manager builds sanitizer-instrumented project images on top of per-language base images and drives the project container through build and fuzzing steps.\n\nExample usage:\n  fuzz-manager build_base_images --only c\n  fuzz-manager build_fuzzers ./projects/libpng --sanitizer address\n  fuzz-manager run_fuzzers ./projects/libpng"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML configuration file.
    #[arg(long, env = "FUZZ_MANAGER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the base image Dockerfiles.
    #[arg(long, env = "FUZZ_MANAGER_BASE_IMAGES", global = true)]
    pub base_images_dir: Option<PathBuf>,

    /// Deadline in seconds for engine API calls.
    #[arg(long, global = true)]
    pub engine_timeout: Option<u64>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build base images.
    #[command(name = "build_base_images")]
    BuildBaseImages(BuildBaseImagesArgs),

    /// Build the docker image of a project.
    #[command(name = "build_project_image")]
    BuildProjectImage(ProjectArgs),

    /// Build fuzzers for a project.
    #[command(name = "build_fuzzers")]
    BuildFuzzers(BuildFuzzersArgs),

    /// Run fuzzers of a project built with `build_fuzzers`.
    #[command(name = "run_fuzzers")]
    RunFuzzers(ProjectPathArgs),

    /// Show the image and container state of a project.
    Status(ProjectPathArgs),
}

/// Arguments for `build_base_images`.
#[derive(Parser, Debug)]
pub struct BuildBaseImagesArgs {
    /// Build the base image only for a specific language.
    #[arg(long, value_enum)]
    pub only: Option<Language>,
}

/// Arguments identifying a project and how to build its image.
#[derive(Parser, Debug)]
pub struct ProjectArgs {
    /// Path to the project.
    pub project_path: PathBuf,

    /// Dockerfile name, relative to the project root.
    #[arg(long, default_value = DEFAULT_DOCKERFILE)]
    pub dockerfile: String,

    /// The language of the project.
    #[arg(long, value_enum, default_value = "c")]
    pub language: Language,
}

impl ProjectArgs {
    fn request(&self) -> ProjectRequest {
        ProjectRequest::new(&self.project_path)
            .with_language(self.language)
            .with_dockerfile(self.dockerfile.clone())
    }
}

/// Arguments for `build_fuzzers`.
#[derive(Parser, Debug)]
pub struct BuildFuzzersArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Sanitizer to build the fuzzers with.
    #[arg(long, value_enum, default_value = "address")]
    pub sanitizer: Sanitizer,
}

/// Arguments for commands that only need the project path.
#[derive(Parser, Debug)]
pub struct ProjectPathArgs {
    /// Path to the project.
    pub project_path: PathBuf,
}

/// Parse CLI arguments and return the Cli struct.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with pre-parsed arguments against the local Docker daemon.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let engine: Arc<dyn ContainerEngine> =
        Arc::new(DockerClient::new(config.engine.clone()).map_err(ManagerError::from_engine)?);

    let manager = FuzzManager::new(engine, config);
    run_command(&manager, cli.command).await?;
    Ok(())
}

/// Builds the effective configuration: file first, then flag overrides.
pub fn load_config(cli: &Cli) -> Result<ManagerConfig, ManagerError> {
    let mut config = match &cli.config {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };

    if let Some(dir) = &cli.base_images_dir {
        config = config.with_base_images_dir(dir);
    }
    if let Some(seconds) = cli.engine_timeout {
        config = config.with_api_timeout(seconds);
    }
    Ok(config)
}

/// Executes one subcommand.
pub async fn run_command(manager: &FuzzManager, command: Commands) -> Result<(), ManagerError> {
    match command {
        Commands::BuildBaseImages(args) => {
            let built = manager.build_base_images(args.only).await?;
            let names: Vec<String> = built.iter().map(|l| l.base_image_name()).collect();
            info!(images = %names.join(", "), "Docker images built successfully");
        }
        Commands::BuildProjectImage(args) => {
            manager.build_project_image(&args.request()).await?;
        }
        Commands::BuildFuzzers(args) => {
            let request = args.project.request().with_sanitizer(args.sanitizer);
            manager.build_fuzzers(&request).await?;
        }
        Commands::RunFuzzers(args) => {
            manager.run_fuzzers(&args.project_path).await?;
        }
        Commands::Status(args) => {
            let state = manager.status(&args.project_path).await?;
            println!("{}: {}", args.project_path.display(), state);
        }
    }
    Ok(())
}

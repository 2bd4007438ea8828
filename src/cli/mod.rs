//! Command-line interface for fuzz-manager.
//!
//! Provides commands for building base images, project images and fuzzers,
//! and for running fuzzers in an existing project container.

mod commands;

pub use commands::{
    load_config, parse_cli, run_command, run_with_cli, BuildBaseImagesArgs,
    BuildFuzzersArgs, Cli, Commands, ProjectArgs, ProjectPathArgs,
};

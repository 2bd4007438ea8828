//! fuzz-manager CLI entry point.
//!
//! Initializes logging, delegates to the CLI module and maps failures onto
//! per-kind exit codes.

use std::process::ExitCode;

use fuzz_manager::ManagerError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse CLI arguments first to get log_level
    let cli = fuzz_manager::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    match fuzz_manager::cli::run_with_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<ManagerError>()
                .map(ManagerError::exit_code)
                .unwrap_or(1);
            tracing::error!(exit_code = code, "{err:#}");
            ExitCode::from(code)
        }
    }
}

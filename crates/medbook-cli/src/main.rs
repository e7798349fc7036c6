//! medbook - a command-line client for the medbook appointment service.
//!
//! Each subcommand maps to one page of the web front end. When the backend
//! session cannot be recovered the command stops and asks for a fresh login.

mod cli;
mod commands;
mod output;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use medbook_core::api::ApiError;
use medbook_core::Config;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Exit code when the user has to log in again
const EXIT_LOGIN_REQUIRED: u8 = 2;

/// Initialize the tracing subscriber for logging.
/// RUST_LOG controls the level (e.g. RUST_LOG=medbook_core=debug).
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("medbook starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(backend) = cli.credentials {
        config.credential_backend = backend;
    }
    debug!(base_url = %config.base_url(), backend = ?config.credential_backend, "Configuration loaded");

    commands::dispatch(cli.command, config).await
}

/// Print the error; login-related failures get one central instruction.
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::SessionExpired) => {
            eprintln!("Your session has expired. Run `medbook login` to sign in again.");
            ExitCode::from(EXIT_LOGIN_REQUIRED)
        }
        Some(ApiError::Unauthenticated) => {
            eprintln!("You are not logged in. Run `medbook login` first.");
            ExitCode::from(EXIT_LOGIN_REQUIRED)
        }
        Some(api_err) => {
            match api_err.server_message() {
                Some(msg) => eprintln!("Error: {}", msg),
                None => eprintln!("Error: {}", api_err),
            }
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

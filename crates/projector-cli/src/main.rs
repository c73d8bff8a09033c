// crates/projector-cli/src/main.rs
// ============================================================================
// Module: Projector CLI Entry Point
// Description: Command dispatcher for the projector gateway.
// Purpose: Run the gateway and check its configuration.
// Dependencies: clap, projector-config, projector-server, tokio, tokio-util
// ============================================================================

//! ## Overview
//! `projectord serve` loads configuration, builds the gateway, and serves
//! until Ctrl-C. Both commands resolve the database secret before doing
//! anything else, so a production deployment with an unreadable password
//! file fails at startup. `projectord config validate` prints a summary with
//! the password redacted.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use projector_config::DatabaseConnection;
use projector_config::ProjectorConfig;
use projector_server::ProjectorServer;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "projectord", disable_help_subcommand = true)]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the projector gateway.
    Serve {
        /// Configuration file; falls back to `PROJECTOR_CONFIG`.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Configuration utilities.
    Config {
        /// Configuration subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, then print a summary.
    Validate {
        /// Configuration file; falls back to `PROJECTOR_CONFIG`.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// CLI failures, printed to stderr.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded.
    #[error("config load failed: {0}")]
    Config(String),
    /// The server could not be built.
    #[error("server init failed: {0}")]
    Init(String),
    /// The server stopped with an error.
    #[error("server failed: {0}")]
    Serve(String),
    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Output(String),
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve {
            config,
        } => command_serve(config).await,
        Commands::Config {
            command: ConfigCommand::Validate {
                config,
            },
        } => command_config_validate(config),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the gateway until Ctrl-C.
async fn command_serve(path: Option<PathBuf>) -> CliResult<ExitCode> {
    let config = ProjectorConfig::load(path.as_deref())
        .map_err(|err| CliError::Config(err.to_string()))?;
    resolve_database(&config)?;
    let server = tokio::task::spawn_blocking(move || ProjectorServer::from_config(config))
        .await
        .map_err(|err| CliError::Init(format!("init join failed: {err}")))?
        .map_err(|err| CliError::Init(err.to_string()))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        // A failed signal registration leaves the server running until killed.
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    server.serve(cancel).await.map_err(|err| CliError::Serve(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Validates configuration and prints a redacted summary.
fn command_config_validate(path: Option<PathBuf>) -> CliResult<ExitCode> {
    let config = ProjectorConfig::load(path.as_deref())
        .map_err(|err| CliError::Config(err.to_string()))?;
    let connection = resolve_database(&config)?;
    for line in config_summary(&config, &connection.redacted()) {
        write_stdout_line(&line).map_err(|err| CliError::Output(err.to_string()))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolves the database secret; outside development mode a missing one is fatal.
fn resolve_database(config: &ProjectorConfig) -> CliResult<DatabaseConnection> {
    config
        .database
        .connection(config.server.development)
        .map_err(|err| CliError::Config(err.to_string()))
}

/// Renders the validated configuration as `key: value` lines.
fn config_summary(config: &ProjectorConfig, database: &str) -> Vec<String> {
    let live_votes = if config.public_access_only {
        "disabled (public access only)".to_string()
    } else {
        format!("{} every {}ms", config.live_votes.url, config.live_votes.interval_ms)
    };
    vec![
        "config: ok".to_string(),
        format!("bind: {}", config.server.bind),
        format!("development: {}", config.server.development),
        format!("public_access_only: {}", config.public_access_only),
        format!(
            "restricter: {} (timeout {}ms)",
            config.restricter.url, config.restricter.timeout_ms
        ),
        format!("live_votes: {live_votes}"),
        format!("message_bus: {}", config.message_bus.address()),
        format!("database: {database}"),
        format!("auth_tokens: {}", config.auth.tokens.len()),
    ]
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

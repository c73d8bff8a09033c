// crates/projector-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Tests
// Description: Unit tests for argument parsing and config summaries.
// Purpose: Keep the command surface and redaction stable.
// Dependencies: clap, projector-config
// ============================================================================

//! ## Overview
//! Parses representative command lines and checks that the validation
//! summary never shows the database password.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use projector_config::DEV_PASSWORD_FALLBACK;
use projector_config::ProjectorConfig;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::CliError;
use super::config_summary;
use super::resolve_database;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn serve_accepts_config_path() {
    let cli = Cli::try_parse_from(["projectord", "serve", "--config", "/etc/projector.toml"])
        .expect("parse");
    match cli.command {
        Commands::Serve {
            config,
        } => assert_eq!(config, Some(PathBuf::from("/etc/projector.toml"))),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn config_validate_is_nested() {
    let cli = Cli::try_parse_from(["projectord", "config", "validate"]).expect("parse");
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate {
                config: None
            }
        }
    ));
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["projectord"]).is_err());
    assert!(Cli::try_parse_from(["projectord", "config"]).is_err());
}

#[test]
fn summary_shows_redacted_database_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let secret = dir.path().join("pw");
    fs::write(&secret, "hunter2\n").expect("write");
    let mut config = ProjectorConfig::default();
    config.database.password_file = secret;

    let connection = config.database.connection(false).expect("connection");
    let lines = config_summary(&config, &connection.redacted());
    let text = lines.join("\n");
    assert!(text.contains("password='***'"));
    assert!(!text.contains("hunter2"));
    assert!(text.contains("bind: 0.0.0.0:9051"));
}

#[test]
fn summary_reports_disabled_live_votes() {
    let config = ProjectorConfig {
        public_access_only: true,
        ..ProjectorConfig::default()
    };
    let lines = config_summary(&config, "redacted");
    assert!(lines.iter().any(|line| line == "live_votes: disabled (public access only)"));
}

#[test]
fn unreadable_password_is_fatal_outside_development() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ProjectorConfig::default();
    config.database.password_file = dir.path().join("missing");
    config.server.development = false;

    match resolve_database(&config) {
        Err(CliError::Config(message)) => assert!(message.contains("missing"), "{message}"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn unreadable_password_falls_back_in_development() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ProjectorConfig::default();
    config.database.password_file = dir.path().join("missing");
    config.server.development = true;

    let connection = resolve_database(&config).expect("fallback");
    assert!(connection.conninfo().contains(&format!("password='{DEV_PASSWORD_FALLBACK}'")));
}

//! Secret resolution tests for projector-config.
// crates/projector-config/tests/secrets.rs
// =============================================================================
// Module: Secret Resolution Tests
// Description: Password file reading, development fallback, conninfo rendering.
// Purpose: Ensure credentials resolve fail-closed and never leak on display.
// =============================================================================

#![allow(clippy::use_debug, reason = "Debug output is asserted to be redacted.")]

use std::fs;

use projector_config::DEV_PASSWORD_FALLBACK;
use projector_config::ProjectorConfig;
use projector_config::SecretError;
use projector_config::read_password;

type TestResult = Result<(), String>;

#[test]
fn password_file_trailing_newline_is_trimmed() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("postgres_password");
    fs::write(&path, "hunter2\n").map_err(|err| err.to_string())?;
    let password = read_password(&path, false).map_err(|err| err.to_string())?;
    if password != "hunter2" {
        return Err(format!("unexpected password length {}", password.len()));
    }
    Ok(())
}

#[test]
fn missing_password_file_falls_back_only_in_development() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent");
    let password = read_password(&path, true).map_err(|err| err.to_string())?;
    if password != DEV_PASSWORD_FALLBACK {
        return Err("development mode should use the fallback password".to_string());
    }
    match read_password(&path, false) {
        Err(SecretError::Unreadable(_)) => Ok(()),
        Err(other) => Err(format!("unexpected error {other}")),
        Ok(_) => Err("production mode must not fall back".to_string()),
    }
}

#[test]
fn conninfo_escapes_quotes_and_backslashes() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("postgres_password");
    fs::write(&path, r"pa'ss\word").map_err(|err| err.to_string())?;

    let mut config = ProjectorConfig::default();
    config.database.host = "db.internal".to_string();
    config.database.user = "o'neil".to_string();
    config.database.password_file = path;
    let connection = config.database.connection(false).map_err(|err| err.to_string())?;

    let expected = concat!(
        r"host='db.internal' port='5432' dbname='openslides' ",
        r"user='o\'neil' password='pa\'ss\\word'"
    );
    if connection.conninfo() != expected {
        return Err(format!("unexpected conninfo {}", connection.redacted()));
    }
    let redacted = connection.redacted();
    if redacted.contains("pa\\'ss") || !redacted.contains("password='***'") {
        return Err(format!("password not redacted: {redacted}"));
    }
    if format!("{connection:?}").contains("pa\\'ss") {
        return Err("debug output leaked the password".to_string());
    }
    Ok(())
}

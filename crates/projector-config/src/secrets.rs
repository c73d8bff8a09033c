// crates/projector-config/src/secrets.rs
// ============================================================================
// Module: Secrets
// Description: Database password resolution and connection string rendering.
// Purpose: Keep credentials out of the parsed config and out of logs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The database password is read from a secret file at startup. In
//! development mode an unreadable file falls back to [`DEV_PASSWORD_FALLBACK`];
//! otherwise resolution fails. [`DatabaseConnection`] renders a libpq
//! key/value connection string and a redacted variant for display.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::DatabaseConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Password used in development mode when the secret file is unreadable.
pub const DEV_PASSWORD_FALLBACK: &str = "openslides";
/// Maximum accepted secret file size in bytes.
const MAX_SECRET_FILE_SIZE: u64 = 64 * 1024;
/// Placeholder rendered instead of the password.
const REDACTED: &str = "***";

// ============================================================================
// SECTION: Password Resolution
// ============================================================================

/// Reads a password from `path`, trimming the trailing line break.
///
/// # Errors
///
/// Returns [`SecretError`] when the file cannot be read outside development
/// mode, or when it exceeds the size limit.
pub fn read_password(path: &Path, development: bool) -> Result<String, SecretError> {
    match read_secret_file(path) {
        Ok(password) => Ok(password),
        Err(SecretError::Unreadable(_)) if development => Ok(DEV_PASSWORD_FALLBACK.to_string()),
        Err(err) => Err(err),
    }
}

/// Reads a secret file with size limits.
fn read_secret_file(path: &Path) -> Result<String, SecretError> {
    let unreadable =
        |err: std::io::Error| SecretError::Unreadable(format!("{}: {err}", path.display()));
    let metadata = fs::metadata(path).map_err(unreadable)?;
    if metadata.len() > MAX_SECRET_FILE_SIZE {
        return Err(SecretError::Invalid(format!("{} exceeds secret size limit", path.display())));
    }
    let content = fs::read_to_string(path).map_err(unreadable)?;
    Ok(content.trim_end_matches(['\r', '\n']).to_string())
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Resolved database connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConnection {
    /// Host name.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Database user.
    pub user: String,
    /// Resolved password.
    password: String,
}

impl DatabaseConnection {
    /// Returns the libpq key/value connection string.
    #[must_use]
    pub fn conninfo(&self) -> String {
        self.render(&self.password)
    }

    /// Returns the connection string with the password replaced.
    #[must_use]
    pub fn redacted(&self) -> String {
        self.render(REDACTED)
    }

    /// Renders all parameters with `password` in the password slot.
    fn render(&self, password: &str) -> String {
        format!(
            "host='{}' port='{}' dbname='{}' user='{}' password='{}'",
            escape_conninfo(&self.host),
            self.port,
            escape_conninfo(&self.name),
            escape_conninfo(&self.user),
            escape_conninfo(password),
        )
    }
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl DatabaseConfig {
    /// Resolves the password and returns the full connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the password cannot be resolved.
    pub fn connection(&self, development: bool) -> Result<DatabaseConnection, SecretError> {
        Ok(DatabaseConnection {
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
            user: self.user.clone(),
            password: read_password(&self.password_file, development)?,
        })
    }
}

/// Escapes a libpq connection value for single-quoted use.
fn escape_conninfo(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Secret resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The secret file could not be read.
    #[error("secret unreadable: {0}")]
    Unreadable(String),
    /// The secret file is unusable.
    #[error("secret invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::escape_conninfo;

    #[test]
    fn escape_doubles_nothing_but_quotes_and_backslashes() {
        assert_eq!(escape_conninfo("plain"), "plain");
        assert_eq!(escape_conninfo(r"it's\here"), r"it\'s\\here");
    }
}

// crates/projector-config/src/config.rs
// ============================================================================
// Module: Projector Configuration
// Description: Configuration loading, environment overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is resolved from an explicit path, the `PROJECTOR_CONFIG`
//! environment variable, or `projector.toml` in the working directory. When
//! none exists the built-in defaults apply. Environment variables of the
//! deployment are layered on top, then the result is validated.
//!
//! Environment access goes through a lookup function so overrides can be
//! tested without touching the process environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "projector.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PROJECTOR_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:9051";
/// Default restriction service endpoint.
pub const DEFAULT_RESTRICTER_URL: &str = "http://autoupdate:9012/internal/autoupdate";
/// Default live vote endpoint.
pub const DEFAULT_VOTE_URL: &str = "http://vote:9013/internal/vote/vote_count";
/// Default authentication cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "refreshId";
/// Default database password file.
pub const DEFAULT_PASSWORD_FILE: &str = "/run/secrets/postgres_password";
/// Maximum number of configured auth tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 256;
/// Maximum length of an auth token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 512;
/// Maximum outbound request timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 60_000;
/// Minimum live vote refresh interval in milliseconds.
pub(crate) const MIN_VOTE_INTERVAL_MS: u64 = 50;
/// Maximum live vote refresh interval in milliseconds.
pub(crate) const MAX_VOTE_INTERVAL_MS: u64 = 3_600_000;
/// Maximum restriction response size in bytes.
pub(crate) const MAX_RESTRICTER_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Environment Variables
// ============================================================================

/// Listen address override.
pub const ENV_BIND: &str = "BIND";
/// Development mode switch.
pub const ENV_DEVELOPMENT: &str = "OPENSLIDES_DEVELOPMENT";
/// Database host override.
pub const ENV_DATABASE_HOST: &str = "DATABASE_HOST";
/// Database port override.
pub const ENV_DATABASE_PORT: &str = "DATABASE_PORT";
/// Database name override.
pub const ENV_DATABASE_NAME: &str = "DATABASE_NAME";
/// Database user override.
pub const ENV_DATABASE_USER: &str = "DATABASE_USER";
/// Database password file override.
pub const ENV_DATABASE_PASSWORD_FILE: &str = "DATABASE_PASSWORD_FILE";
/// Message bus host override.
pub const ENV_MESSAGE_BUS_HOST: &str = "MESSAGE_BUS_HOST";
/// Message bus port override.
pub const ENV_MESSAGE_BUS_PORT: &str = "MESSAGE_BUS_PORT";
/// Restriction service URL override.
pub const ENV_RESTRICTER_URL: &str = "RESTRICTER_URL";
/// Public access only switch.
pub const ENV_PUBLIC_ACCESS_ONLY: &str = "OPENSLIDES_PUBLIC_ACCESS_ONLY";
/// Live vote URL override.
pub const ENV_VOTE_URL: &str = "VOTE_URL";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Projector gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectorConfig {
    /// Serve only public data; disables the live vote flow.
    #[serde(default)]
    pub public_access_only: bool,
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Persisted state connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Message bus connection settings.
    #[serde(default)]
    pub message_bus: MessageBusConfig,
    /// Restriction service client configuration.
    #[serde(default)]
    pub restricter: RestricterConfig,
    /// Live vote source configuration.
    #[serde(default)]
    pub live_votes: LiveVotesConfig,
    /// Request authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Primary flow seeding.
    #[serde(default)]
    pub datastore: DatastoreConfig,
    /// Audit log destination.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProjectorConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| env::var(name).ok())
    }

    /// Loads configuration, resolving environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match resolve_path(path, &lookup)? {
            Some(resolved) => Self::read_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration text without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads and parses a config file with size limits.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        let limit = u64::try_from(MAX_CONFIG_FILE_SIZE).unwrap_or(u64::MAX);
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > limit {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        // The file may have grown since the metadata check.
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Applies deployment environment variables on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(value) = lookup(ENV_DEVELOPMENT) {
            self.server.development = parse_bool(ENV_DEVELOPMENT, &value)?;
        }
        if let Some(host) = lookup(ENV_DATABASE_HOST) {
            self.database.host = host;
        }
        if let Some(value) = lookup(ENV_DATABASE_PORT) {
            self.database.port = parse_port(ENV_DATABASE_PORT, &value)?;
        }
        if let Some(name) = lookup(ENV_DATABASE_NAME) {
            self.database.name = name;
        }
        if let Some(user) = lookup(ENV_DATABASE_USER) {
            self.database.user = user;
        }
        if let Some(path) = lookup(ENV_DATABASE_PASSWORD_FILE) {
            self.database.password_file = PathBuf::from(path);
        }
        if let Some(host) = lookup(ENV_MESSAGE_BUS_HOST) {
            self.message_bus.host = host;
        }
        if let Some(value) = lookup(ENV_MESSAGE_BUS_PORT) {
            self.message_bus.port = parse_port(ENV_MESSAGE_BUS_PORT, &value)?;
        }
        if let Some(url) = lookup(ENV_RESTRICTER_URL) {
            self.restricter.url = url;
        }
        if let Some(value) = lookup(ENV_PUBLIC_ACCESS_ONLY) {
            self.public_access_only = parse_bool(ENV_PUBLIC_ACCESS_ONLY, &value)?;
        }
        if let Some(url) = lookup(ENV_VOTE_URL) {
            self.live_votes.url = url;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.message_bus.validate()?;
        self.restricter.validate()?;
        if !self.public_access_only {
            self.live_votes.validate()?;
        }
        self.auth.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the audit destination after applying the development default.
    #[must_use]
    pub fn audit_destination(&self) -> LogDestination {
        self.logging.destination.unwrap_or(if self.server.development {
            LogDestination::Stderr
        } else {
            LogDestination::Stdout
        })
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address; `:<port>` binds all interfaces.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Development mode: relaxed secrets and stderr logging.
    #[serde(default)]
    pub development: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            development: false,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.trim();
        let normalized =
            if bind.starts_with(':') { format!("0.0.0.0{bind}") } else { bind.to_string() };
        normalized.parse().map_err(|_| {
            ConfigError::Invalid(format!("server.bind `{bind}` is not a socket address"))
        })
    }

    /// Validates listener settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr().map(|_| ())
    }
}

/// Persisted state connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Host name.
    #[serde(default = "default_database_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_database_port")]
    pub port: u16,
    /// Database name.
    #[serde(default = "default_database_name")]
    pub name: String,
    /// Database user.
    #[serde(default = "default_database_user")]
    pub user: String,
    /// File holding the database password.
    #[serde(default = "default_password_file")]
    pub password_file: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_database_host(),
            port: default_database_port(),
            name: default_database_name(),
            user: default_database_user(),
            password_file: default_password_file(),
        }
    }
}

impl DatabaseConfig {
    /// Validates database settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("database.host", &self.host)?;
        require_non_empty("database.name", &self.name)?;
        require_non_empty("database.user", &self.user)?;
        if self.port == 0 {
            return Err(ConfigError::Invalid("database.port must be non-zero".to_string()));
        }
        if self.password_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.password_file must be set".to_string()));
        }
        Ok(())
    }
}

/// Message bus connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageBusConfig {
    /// Host name.
    #[serde(default = "default_message_bus_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_message_bus_port")]
    pub port: u16,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            host: default_message_bus_host(),
            port: default_message_bus_port(),
        }
    }
}

impl MessageBusConfig {
    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates message bus settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("message_bus.host", &self.host)?;
        if self.port == 0 {
            return Err(ConfigError::Invalid("message_bus.port must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Restriction service client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestricterConfig {
    /// Endpoint receiving restriction requests.
    #[serde(default = "default_restricter_url")]
    pub url: String,
    /// Total request timeout in milliseconds.
    #[serde(default = "default_restricter_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_restricter_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum accepted response body size in bytes.
    #[serde(default = "default_restricter_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for RestricterConfig {
    fn default() -> Self {
        Self {
            url: default_restricter_url(),
            timeout_ms: default_restricter_timeout_ms(),
            connect_timeout_ms: default_restricter_connect_timeout_ms(),
            max_response_bytes: default_restricter_max_response_bytes(),
        }
    }
}

impl RestricterConfig {
    /// Returns the total request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validates restriction client settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("restricter.url", &self.url)?;
        validate_timeout("restricter.timeout_ms", self.timeout_ms)?;
        validate_timeout("restricter.connect_timeout_ms", self.connect_timeout_ms)?;
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESTRICTER_RESPONSE_BYTES
        {
            return Err(ConfigError::Invalid(format!(
                "restricter.max_response_bytes must be between 1 and \
                 {MAX_RESTRICTER_RESPONSE_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Live vote source configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveVotesConfig {
    /// Endpoint returning the running tallies.
    #[serde(default = "default_vote_url")]
    pub url: String,
    /// Refresh period in milliseconds.
    #[serde(default = "default_vote_interval_ms")]
    pub interval_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_vote_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LiveVotesConfig {
    fn default() -> Self {
        Self {
            url: default_vote_url(),
            interval_ms: default_vote_interval_ms(),
            timeout_ms: default_vote_timeout_ms(),
        }
    }
}

impl LiveVotesConfig {
    /// Returns the refresh period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates live vote settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("live_votes.url", &self.url)?;
        validate_timeout("live_votes.timeout_ms", self.timeout_ms)?;
        if !(MIN_VOTE_INTERVAL_MS..=MAX_VOTE_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "live_votes.interval_ms must be between {MIN_VOTE_INTERVAL_MS} and \
                 {MAX_VOTE_INTERVAL_MS}"
            )));
        }
        Ok(())
    }
}

/// Request authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Accepted tokens and the user each one authenticates.
    #[serde(default)]
    pub tokens: Vec<AuthTokenConfig>,
    /// Cookie consulted when no bearer token is present.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl AuthConfig {
    /// Validates authentication settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid(format!(
                "auth.tokens exceeds max entries ({MAX_AUTH_TOKENS})"
            )));
        }
        let cookie = self.cookie_name.trim();
        if cookie.is_empty()
            || !cookie
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
        {
            return Err(ConfigError::Invalid(
                "auth.cookie_name must be a non-empty token of [A-Za-z0-9_-]".to_string(),
            ));
        }
        for (index, entry) in self.tokens.iter().enumerate() {
            entry.validate()?;
            if self.tokens[..index].iter().any(|seen| seen.token == entry.token) {
                return Err(ConfigError::Invalid(
                    "auth.tokens contains a duplicate token".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One accepted token.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthTokenConfig {
    /// Secret token value.
    pub token: String,
    /// User the token authenticates.
    pub user_id: u64,
}

impl std::fmt::Debug for AuthTokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokenConfig")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl AuthTokenConfig {
    /// Validates a single token entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.tokens entries must be non-empty".to_string()));
        }
        if self.token.len() > MAX_AUTH_TOKEN_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth.tokens entry exceeds max length ({MAX_AUTH_TOKEN_LENGTH})"
            )));
        }
        if self.token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "auth.tokens entries must not contain whitespace".to_string(),
            ));
        }
        if self.user_id == 0 {
            return Err(ConfigError::Invalid("auth.tokens user_id must be positive".to_string()));
        }
        Ok(())
    }
}

/// Primary flow seeding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatastoreConfig {
    /// JSON object of `<collection>/<id>/<field>` keys loaded at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Audit log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDestination {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
    /// Append-only file at `logging.path`.
    File,
}

/// Audit log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Destination; stdout unless development mode selects stderr.
    #[serde(default)]
    pub destination: Option<LogDestination>,
    /// File path for the `file` destination.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.destination == Some(LogDestination::File) && self.path.is_none() {
            return Err(ConfigError::Invalid(
                "logging.destination=file requires logging.path".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; `None` means run on defaults.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(fallback.is_file().then_some(fallback))
}

/// Parses a boolean environment value.
fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "" => Ok(false),
        other => Err(ConfigError::Invalid(format!("{name} must be a boolean, got `{other}`"))),
    }
}

/// Parses a port environment value.
fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a port number, got `{value}`")))
}

/// Rejects blank strings.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be set")));
    }
    Ok(())
}

/// Requires an absolute http(s) URL with a host.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|err| ConfigError::Invalid(format!("{field} is invalid: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{field} must use http:// or https://")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Requires a timeout within `1..=MAX_TIMEOUT_MS`.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {MAX_TIMEOUT_MS}")));
    }
    Ok(())
}

/// Default listen address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default database host.
fn default_database_host() -> String {
    "localhost".to_string()
}

/// Default database port.
const fn default_database_port() -> u16 {
    5432
}

/// Default database name.
fn default_database_name() -> String {
    "openslides".to_string()
}

/// Default database user.
fn default_database_user() -> String {
    "openslides".to_string()
}

/// Default database password file.
fn default_password_file() -> PathBuf {
    PathBuf::from(DEFAULT_PASSWORD_FILE)
}

/// Default message bus host.
fn default_message_bus_host() -> String {
    "localhost".to_string()
}

/// Default message bus port.
const fn default_message_bus_port() -> u16 {
    6379
}

/// Default restriction service URL.
fn default_restricter_url() -> String {
    DEFAULT_RESTRICTER_URL.to_string()
}

/// Default restriction request timeout.
const fn default_restricter_timeout_ms() -> u64 {
    5_000
}

/// Default restriction connect timeout.
const fn default_restricter_connect_timeout_ms() -> u64 {
    1_000
}

/// Default restriction response size limit.
const fn default_restricter_max_response_bytes() -> usize {
    1024 * 1024
}

/// Default live vote URL.
fn default_vote_url() -> String {
    DEFAULT_VOTE_URL.to_string()
}

/// Default live vote refresh period.
const fn default_vote_interval_ms() -> u64 {
    1_000
}

/// Default live vote request timeout.
const fn default_vote_timeout_ms() -> u64 {
    2_000
}

/// Default auth cookie name.
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

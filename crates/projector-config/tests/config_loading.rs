//! Config loading, override, and validation tests for projector-config.
// crates/projector-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Defaults, file loading, environment overrides, and validation.
// Purpose: Ensure configuration fails closed and honours deployment variables.
// =============================================================================

#![allow(clippy::use_debug, reason = "Test failures render the unexpected value.")]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use projector_config::ConfigError;
use projector_config::LogDestination;
use projector_config::ProjectorConfig;

type TestResult = Result<(), String>;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: BTreeMap<String, String> =
        pairs.iter().map(|(name, value)| ((*name).to_string(), (*value).to_string())).collect();
    move |name| vars.get(name).cloned()
}

fn no_env(_name: &str) -> Option<String> {
    None
}

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

fn write_config(dir: &Path, content: &str) -> Result<std::path::PathBuf, String> {
    let path = dir.join("projector.toml");
    fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok(path)
}

#[test]
fn defaults_validate_and_match_deployment() -> TestResult {
    let config = ProjectorConfig::from_toml_str("").map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let bind = config.server.bind_addr().map_err(|err| err.to_string())?;
    if bind.port() != 9051 {
        return Err(format!("unexpected default port {}", bind.port()));
    }
    if config.restricter.url != "http://autoupdate:9012/internal/autoupdate" {
        return Err("unexpected default restricter url".to_string());
    }
    if config.restricter.timeout_ms != 5_000 || config.restricter.connect_timeout_ms != 1_000 {
        return Err("unexpected default restricter timeouts".to_string());
    }
    if config.live_votes.interval_ms != 1_000 || config.live_votes.timeout_ms != 2_000 {
        return Err("unexpected default live vote timing".to_string());
    }
    if config.auth.cookie_name != "refreshId" {
        return Err("unexpected default cookie name".to_string());
    }
    if config.audit_destination() != LogDestination::Stdout {
        return Err("audit log should default to stdout".to_string());
    }
    Ok(())
}

#[test]
fn development_mode_logs_to_stderr() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = write_config(dir.path(), "")?;
    let config =
        ProjectorConfig::load_with_env(Some(&path), env_from(&[("OPENSLIDES_DEVELOPMENT", "1")]))
            .map_err(|err| err.to_string())?;
    if !config.server.development || config.audit_destination() != LogDestination::Stderr {
        return Err("development mode should select stderr".to_string());
    }
    Ok(())
}

#[test]
fn environment_overrides_file_values() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = write_config(
        dir.path(),
        r#"
[server]
bind = "127.0.0.1:7000"

[restricter]
url = "http://file-restricter:1/internal"
timeout_ms = 250
"#,
    )?;
    let config = ProjectorConfig::load_with_env(
        Some(&path),
        env_from(&[
            ("BIND", ":9999"),
            ("RESTRICTER_URL", "http://env-restricter:2/internal"),
            ("DATABASE_PORT", "6543"),
            ("MESSAGE_BUS_HOST", "redis"),
            ("OPENSLIDES_PUBLIC_ACCESS_ONLY", "true"),
            ("VOTE_URL", "http://votes:1/count"),
        ]),
    )
    .map_err(|err| err.to_string())?;
    let bind = config.server.bind_addr().map_err(|err| err.to_string())?;
    if bind.to_string() != "0.0.0.0:9999" {
        return Err(format!("unexpected bind {bind}"));
    }
    if config.restricter.url != "http://env-restricter:2/internal" {
        return Err("RESTRICTER_URL should override the file".to_string());
    }
    if config.restricter.timeout_ms != 250 {
        return Err("file timeout should survive overrides".to_string());
    }
    if config.database.port != 6543 || config.message_bus.address() != "redis:6379" {
        return Err("database or message bus overrides not applied".to_string());
    }
    if !config.public_access_only || config.live_votes.url != "http://votes:1/count" {
        return Err("public access or vote overrides not applied".to_string());
    }
    Ok(())
}

#[test]
fn config_env_var_selects_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = write_config(dir.path(), "public_access_only = true\n")?;
    let path_text = path.to_string_lossy().to_string();
    let config =
        ProjectorConfig::load_with_env(None, env_from(&[("PROJECTOR_CONFIG", path_text.as_str())]))
            .map_err(|err| err.to_string())?;
    if !config.public_access_only {
        return Err("PROJECTOR_CONFIG file was not loaded".to_string());
    }
    Ok(())
}

#[test]
fn invalid_env_values_are_rejected() -> TestResult {
    let mut config = ProjectorConfig::default();
    assert_invalid(
        config.apply_env_overrides(env_from(&[("OPENSLIDES_DEVELOPMENT", "maybe")])),
        "OPENSLIDES_DEVELOPMENT must be a boolean",
    )?;
    assert_invalid(
        config.apply_env_overrides(env_from(&[("DATABASE_PORT", "70000")])),
        "DATABASE_PORT must be a port number",
    )?;
    config.apply_env_overrides(no_env).map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn oversized_config_file_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let padding = "#".repeat(projector_config::MAX_CONFIG_FILE_SIZE + 1);
    let path = write_config(dir.path(), &padding)?;
    match ProjectorConfig::load_with_env(Some(&path), no_env) {
        Err(ConfigError::Invalid(message)) if message.contains("size limit") => Ok(()),
        other => Err(format!("unexpected result {other:?}")),
    }
}

#[test]
fn huge_config_file_is_rejected_from_metadata() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("huge.toml");
    let file = fs::File::create(&path).map_err(|err| err.to_string())?;
    file.set_len(64 * 1024 * 1024).map_err(|err| err.to_string())?;
    match ProjectorConfig::load_with_env(Some(&path), no_env) {
        Err(ConfigError::Invalid(message)) if message.contains("size limit") => Ok(()),
        other => Err(format!("unexpected result {other:?}")),
    }
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    match ProjectorConfig::from_toml_str("[server]\nport = 1\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("unexpected result {other:?}")),
    }
}

#[test]
fn restricter_settings_are_validated() -> TestResult {
    let mut config = ProjectorConfig::default();
    config.restricter.url = "ftp://autoupdate/internal".to_string();
    assert_invalid(config.validate(), "restricter.url must use http:// or https://")?;

    let mut config = ProjectorConfig::default();
    config.restricter.timeout_ms = 0;
    assert_invalid(config.validate(), "restricter.timeout_ms")?;

    let mut config = ProjectorConfig::default();
    config.restricter.max_response_bytes = 0;
    assert_invalid(config.validate(), "restricter.max_response_bytes")?;
    Ok(())
}

#[test]
fn live_votes_are_not_validated_in_public_access_mode() -> TestResult {
    let mut config = ProjectorConfig::default();
    config.live_votes.url = "not a url".to_string();
    assert_invalid(config.validate(), "live_votes.url")?;
    config.public_access_only = true;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn auth_tokens_are_validated() -> TestResult {
    let config = ProjectorConfig::from_toml_str(
        r#"
[[auth.tokens]]
token = "alpha"
user_id = 1

[[auth.tokens]]
token = "alpha"
user_id = 2
"#,
    )
    .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "duplicate token")?;

    let config = ProjectorConfig::from_toml_str("[[auth.tokens]]\ntoken = \"beta\"\nuser_id = 0\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "user_id must be positive")?;

    let config = ProjectorConfig::from_toml_str("[auth]\ncookie_name = \"bad cookie\"\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "auth.cookie_name")?;
    Ok(())
}

#[test]
fn token_debug_output_is_redacted() -> TestResult {
    let config =
        ProjectorConfig::from_toml_str("[[auth.tokens]]\ntoken = \"s3cret\"\nuser_id = 4\n")
            .map_err(|err| err.to_string())?;
    let rendered = format!("{:?}", config.auth.tokens);
    if rendered.contains("s3cret") {
        return Err("token leaked into debug output".to_string());
    }
    Ok(())
}

#[test]
fn file_logging_requires_path() -> TestResult {
    let config = ProjectorConfig::from_toml_str("[logging]\ndestination = \"file\"\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "logging.destination=file requires logging.path")?;

    let config = ProjectorConfig::from_toml_str(
        "[logging]\ndestination = \"file\"\npath = \"/tmp/projector-audit.log\"\n",
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.audit_destination() != LogDestination::File {
        return Err("explicit destination should win".to_string());
    }
    Ok(())
}

#[test]
fn malformed_bind_is_rejected() -> TestResult {
    let mut config = ProjectorConfig::default();
    config.server.bind = "localhost".to_string();
    assert_invalid(config.validate(), "server.bind")
}

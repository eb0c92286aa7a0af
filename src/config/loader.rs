//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::ValidationError;

/// Connection string variable read by ASP.NET Core applications; honoured so
/// the gate can share the application's environment.
pub const ASPNET_CONNECTION_VAR: &str = "ConnectionStrings__DefaultConnection";

pub const TARGET_VAR: &str = "STARTUP_GATE_TARGET";
pub const MAX_ATTEMPTS_VAR: &str = "STARTUP_GATE_MAX_ATTEMPTS";
pub const DELAY_SECS_VAR: &str = "STARTUP_GATE_DELAY_SECS";
pub const PROBE_VAR: &str = "STARTUP_GATE_PROBE";
pub const LOG_FORMAT_VAR: &str = "STARTUP_GATE_LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} in {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document without semantic validation.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read a TOML file without semantic validation.
pub fn read_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
pub fn apply_env_overrides<F>(config: &mut GateConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(target) = non_empty(TARGET_VAR).or_else(|| non_empty(ASPNET_CONNECTION_VAR)) {
        config.target.connection_string = Some(target);
    }

    if let Some(value) = non_empty(MAX_ATTEMPTS_VAR) {
        config.retry.max_attempts = parse_env(MAX_ATTEMPTS_VAR, value)?;
    }

    if let Some(value) = non_empty(DELAY_SECS_VAR) {
        config.retry.delay_secs = parse_env(DELAY_SECS_VAR, value)?;
        config.retry.delay_ms = None;
    }

    if let Some(value) = non_empty(PROBE_VAR) {
        config.probe.kind = parse_env(PROBE_VAR, value)?;
    }

    if let Some(value) = non_empty(LOG_FORMAT_VAR) {
        config.observability.log_format = parse_env(LOG_FORMAT_VAR, value)?;
    }

    Ok(())
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Env {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::probe::ProbeKind;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_parse_full_document() {
        let config = parse_config(
            r#"
            [target]
            connection_string = "Server=db;Port=3306;Database=app;User=api;Password=secret"

            [probe]
            kind = "tcp"
            timeout_secs = 2

            [retry]
            max_attempts = 10
            delay_ms = 500

            [migrations]
            command = ["dotnet", "ef", "database", "update"]

            [status]
            enabled = true
            bind_address = "127.0.0.1:8090"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.kind, ProbeKind::Tcp);
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.delay(), Duration::from_millis(500));
        assert_eq!(config.migrations.command.len(), 4);
        assert!(config.status.enabled);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retry.max_attempts, 30);
        assert_eq!(config.retry.delay(), Duration::from_secs(5));
        assert_eq!(config.probe.kind, ProbeKind::Mysql);
        assert!(!config.migrations.is_enabled());
        assert!(config.target.connection_string.is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[retry]\nmax_attempts = \"many\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_read_leaves_validation_to_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nmax_attempts = 0").unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 0);
        assert!(config.target.connection_string.is_none());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GateConfig::default();
        config.retry.delay_ms = Some(100);

        apply_env_overrides(
            &mut config,
            env(&[
                (ASPNET_CONNECTION_VAR, "Server=mysql;Database=app"),
                (MAX_ATTEMPTS_VAR, "12"),
                (DELAY_SECS_VAR, "2"),
                (PROBE_VAR, "tcp"),
                (LOG_FORMAT_VAR, "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.target.connection_string.as_deref(), Some("Server=mysql;Database=app"));
        assert_eq!(config.retry.max_attempts, 12);
        assert_eq!(config.retry.delay(), Duration::from_secs(2));
        assert_eq!(config.probe.kind, ProbeKind::Tcp);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_gate_variable_wins_over_aspnet_variable() {
        let mut config = GateConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[(TARGET_VAR, "db:3307"), (ASPNET_CONNECTION_VAR, "Server=other")]),
        )
        .unwrap();
        assert_eq!(config.target.connection_string.as_deref(), Some("db:3307"));
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = GateConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(MAX_ATTEMPTS_VAR, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: MAX_ATTEMPTS_VAR, .. }));
    }
}

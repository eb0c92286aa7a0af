//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeKind;
use crate::target::{ConnectionDescriptor, DescriptorError};

/// Root configuration for the startup gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Dependency to wait for.
    pub target: TargetConfig,

    /// How each attempt checks the dependency.
    pub probe: ProbeConfig,

    /// Attempt budget and spacing.
    pub retry: RetryConfig,

    /// Command run once the dependency is ready.
    pub migrations: MigrationConfig,

    /// Status listener, bound only after readiness.
    pub status: StatusConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl GateConfig {
    /// Parse the configured connection string.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor, DescriptorError> {
        ConnectionDescriptor::parse(self.target.connection_string.as_deref().unwrap_or_default())
    }
}

/// Target dependency configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    /// Connection string in keyword, URL or `host:port` form.
    pub connection_string: Option<String>,
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// `tcp` or `mysql`.
    pub kind: ProbeKind,

    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            kind: ProbeKind::Mysql,
            timeout_secs: 5,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of probe attempts.
    pub max_attempts: u32,

    /// Delay between attempts in seconds.
    pub delay_secs: u64,

    /// Delay between attempts in milliseconds; wins over `delay_secs`.
    pub delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay_secs: 5,
            delay_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        match self.delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs(self.delay_secs),
        }
    }
}

/// Migration hook configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MigrationConfig {
    /// Program and arguments; empty disables the hook.
    pub command: Vec<String>,
}

impl MigrationConfig {
    pub fn is_enabled(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Status listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Serve `/health`, `/ready` and `/metrics` after readiness.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0:8090".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected pretty or json)", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `pretty` for terminals, `json` for log shippers.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

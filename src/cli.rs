//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{apply_env_overrides, read_config, validate_config, ConfigError, GateConfig, LogFormat};
use crate::probe::ProbeKind;

#[derive(Debug, Parser)]
#[command(name = "startup-gate", version)]
#[command(about = "Hold an application back until its database accepts connections", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Connection string of the dependency
    #[arg(short, long)]
    pub target: Option<String>,

    /// Maximum number of probe attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long)]
    pub delay_secs: Option<u64>,

    /// Seconds before a single probe gives up
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,

    /// Probe flavour
    #[arg(long, value_enum)]
    pub probe: Option<ProbeKind>,

    /// Migration command to run once ready (split on whitespace)
    #[arg(long)]
    pub migrate: Option<String>,

    /// Serve /health, /ready and /metrics on this address once ready
    #[arg(long)]
    pub status_addr: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Application to start once ready
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Overlay command line flags onto `config`.
    pub fn apply(&self, config: &mut GateConfig) {
        if let Some(target) = &self.target {
            config.target.connection_string = Some(target.clone());
        }
        if let Some(max) = self.max_attempts {
            config.retry.max_attempts = max;
        }
        if let Some(delay) = self.delay_secs {
            config.retry.delay_secs = delay;
            config.retry.delay_ms = None;
        }
        if let Some(timeout) = self.probe_timeout_secs {
            config.probe.timeout_secs = timeout;
        }
        if let Some(kind) = self.probe {
            config.probe.kind = kind;
        }
        if let Some(migrate) = &self.migrate {
            config.migrations.command = migrate.split_whitespace().map(str::to_string).collect();
        }
        if let Some(addr) = &self.status_addr {
            config.status.enabled = true;
            config.status.bind_address = addr.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }

    /// File (or defaults), then environment, then flags, then validation.
    pub fn resolve_config<F>(&self, lookup: F) -> Result<GateConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GateConfig::default(),
        };
        apply_env_overrides(&mut config, lookup)?;
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

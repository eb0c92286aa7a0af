//! Startup orchestration.
//!
//! # Responsibilities
//! - Wait for the dependency through the readiness gate
//! - Apply migrations once it is reachable
//! - Start the status listener and the supervised application
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order, not concurrently
//! - Listeners start last (traffic only when ready)

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GateConfig};
use crate::gate::{GateError, ReadinessGate, RetryPolicy};
use crate::http::StatusServer;
use crate::lifecycle::app::Supervisor;
use crate::lifecycle::migrations::{MigrationError, MigrationRunner};
use crate::lifecycle::Shutdown;
use crate::probe::AnyProbe;
use crate::target::DescriptorError;

/// sysexits(3) codes used when startup aborts.
pub mod exit_codes {
    pub const FAILURE: u8 = 1;
    pub const UNAVAILABLE: u8 = 69;
    pub const SOFTWARE: u8 = 70;
    pub const CONFIG: u8 = 78;
    pub const NOT_FOUND: u8 = 127;
    pub const INTERRUPTED: u8 = 130;
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid connection string: {0}")]
    Target(#[from] DescriptorError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("failed to start application '{program}': {source}")]
    App {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("status server failed: {0}")]
    Status(#[source] std::io::Error),
}

impl StartupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) | StartupError::Target(_) => exit_codes::CONFIG,
            StartupError::Gate(GateError::Exhausted { .. }) => exit_codes::UNAVAILABLE,
            StartupError::Gate(GateError::Cancelled { .. }) => exit_codes::INTERRUPTED,
            StartupError::Migration(MigrationError::Interrupted { .. }) => exit_codes::INTERRUPTED,
            StartupError::Migration(_) => exit_codes::SOFTWARE,
            StartupError::App { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                exit_codes::NOT_FOUND
            }
            StartupError::App { .. } | StartupError::Status(_) => exit_codes::FAILURE,
        }
    }
}

/// The whole startup sequence for one process.
pub struct Startup {
    config: GateConfig,
    app: Vec<String>,
    shutdown: Shutdown,
}

impl Startup {
    /// `config` must already be validated.
    pub fn new(config: GateConfig, app: Vec<String>) -> Self {
        Self {
            config,
            app,
            shutdown: Shutdown::new(),
        }
    }

    /// Handle for triggering shutdown (signal listener, tests).
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Gate → migrations → status server → application.
    ///
    /// Returns the exit code the process should end with.
    pub async fn run(self) -> Result<i32, StartupError> {
        let descriptor = self.config.descriptor()?;
        let connection_string = self.config.target.connection_string.clone().unwrap_or_default();

        let probe = AnyProbe::new(self.config.probe.kind, &descriptor, self.config.probe.timeout());
        let gate = ReadinessGate::new(probe, RetryPolicy::from_config(&self.config.retry));
        let report = gate.wait_until(self.shutdown.signalled()).await?;

        if let Some(migrations) = MigrationRunner::from_config(&self.config.migrations, &connection_string) {
            migrations.run(self.shutdown.signalled()).await?;
        }

        let status = if self.config.status.enabled {
            let listener = TcpListener::bind(&self.config.status.bind_address)
                .await
                .map_err(StartupError::Status)?;
            let server = StatusServer::new(report, &self.config.status);
            Some(tokio::spawn(server.run(listener, self.shutdown.signalled())))
        } else {
            None
        };

        let code = match Supervisor::new(self.app, &connection_string) {
            Some(app) => {
                let code = app
                    .run(self.shutdown.signalled())
                    .await
                    .map_err(|source| StartupError::App {
                        program: app.program().to_string(),
                        source,
                    });
                // The status server lives as long as the application.
                self.shutdown.trigger();
                code?
            }
            None if status.is_some() => {
                tracing::info!("No application command given; serving status until shutdown");
                self.shutdown.signalled().await;
                0
            }
            None => 0,
        };

        if let Some(handle) = status {
            match handle.await {
                Ok(result) => result.map_err(StartupError::Status)?,
                Err(e) => tracing::error!(error = %e, "Status server task failed"),
            }
        }

        Ok(code)
    }
}

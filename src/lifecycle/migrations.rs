//! Post-readiness migration hook.
//!
//! # Responsibilities
//! - Run the configured migration command once the database accepts connections
//! - Treat any failure as fatal to startup
//!
//! # Design Decisions
//! - The command decides whether migrations are pending (e.g. `dotnet ef database update`)
//! - No shell: the command is an argument vector

use std::future::Future;
use std::process::ExitStatus;

use thiserror::Error;

use crate::config::MigrationConfig;
use crate::lifecycle::process::{ChildCommand, RunOutcome};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to start migration command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration command '{program}' failed with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("migration command '{program}' interrupted by shutdown")]
    Interrupted { program: String },
}

pub struct MigrationRunner {
    command: ChildCommand,
}

impl MigrationRunner {
    /// Returns `None` when no migration command is configured.
    pub fn from_config(config: &MigrationConfig, connection_string: &str) -> Option<Self> {
        ChildCommand::new(config.command.clone()).map(|command| Self {
            command: command.env_default(crate::config::loader::ASPNET_CONNECTION_VAR, connection_string),
        })
    }

    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), MigrationError> {
        let program = self.command.program().to_string();
        tracing::info!(program = %program, args = ?self.command.args(), "Applying migrations");

        let outcome = self
            .command
            .run_until(shutdown)
            .await
            .map_err(|source| MigrationError::Spawn {
                program: program.clone(),
                source,
            })?;

        match outcome {
            RunOutcome::Exited(status) if status.success() => {
                tracing::info!(program = %program, "Migrations applied");
                Ok(())
            }
            RunOutcome::Exited(status) => Err(MigrationError::Failed { program, status }),
            RunOutcome::Interrupted => Err(MigrationError::Interrupted { program }),
        }
    }
}

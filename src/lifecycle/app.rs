//! Supervised application.
//!
//! The command given after `--` on the command line is started only once the
//! gate and migrations succeed. Its exit code becomes the gate's exit code.

use std::future::Future;

use crate::config::loader::ASPNET_CONNECTION_VAR;
use crate::lifecycle::process::{exit_code, ChildCommand, RunOutcome};

/// Exit code reported when shutdown interrupts the application (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

pub struct Supervisor {
    command: ChildCommand,
}

impl Supervisor {
    /// Returns `None` when no application command was given.
    pub fn new(argv: Vec<String>, connection_string: &str) -> Option<Self> {
        ChildCommand::new(argv).map(|command| Self {
            command: command.env_default(ASPNET_CONNECTION_VAR, connection_string),
        })
    }

    pub fn program(&self) -> &str {
        self.command.program()
    }

    /// Run the application to completion and return its exit code.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> std::io::Result<i32> {
        tracing::info!(program = %self.program(), args = ?self.command.args(), "Starting application");

        let code = match self.command.run_until(shutdown).await? {
            RunOutcome::Exited(status) => exit_code(status),
            RunOutcome::Interrupted => INTERRUPTED_EXIT_CODE,
        };

        tracing::info!(program = %self.program(), exit_code = code, "Application exited");
        Ok(code)
    }
}

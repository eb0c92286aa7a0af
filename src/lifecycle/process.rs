//! Child process execution shared by the migration hook and the supervised application.

use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

/// How a child run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Exited(ExitStatus),
    /// Shutdown was triggered; the child was killed.
    Interrupted,
}

/// A program plus arguments, run without a shell.
#[derive(Debug, Clone)]
pub struct ChildCommand {
    argv: Vec<String>,
    env: Vec<(String, String)>,
}

impl ChildCommand {
    /// Returns `None` for an empty argument vector.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.first().map_or(true, |p| p.trim().is_empty()) {
            return None;
        }
        Some(Self { argv, env: Vec::new() })
    }

    /// Set `key` for the child unless the parent environment already has it.
    pub fn env_default(mut self, key: &str, value: &str) -> Self {
        if std::env::var_os(key).is_none() {
            self.env.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Spawn with inherited stdio and wait, killing the child if `shutdown` fires first.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> io::Result<RunOutcome> {
        let mut child = Command::new(self.program())
            .args(self.args())
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(program = %self.program(), pid = ?child.id(), "Child process started");

        tokio::select! {
            status = child.wait() => Ok(RunOutcome::Exited(status?)),
            _ = shutdown => {
                tracing::info!(program = %self.program(), "Stopping child process");
                child.kill().await?;
                Ok(RunOutcome::Interrupted)
            }
        }
    }
}

/// Map an exit status to a process exit code (128 + signal for signalled children).
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

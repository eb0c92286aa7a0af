//! startup-gate
//!
//! Blocks until a database accepts connections, then runs migrations and
//! hands over to the application.
//!
//! # Startup Sequence
//!
//! ```text
//!   config file ─┐
//!   environment ─┼─▶ GateConfig ─▶ ReadinessGate ──Ready──▶ migrations ─▶ status server ─▶ application
//!   flags ───────┘                      │                                                    │
//!                                   Exhausted                                           exit code
//!                                       ▼                                                    ▼
//!                                  exit 69                                              process exit
//! ```

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;

use startup_gate::cli::Cli;
use startup_gate::lifecycle::signals::spawn_signal_listener;
use startup_gate::lifecycle::startup::exit_codes;
use startup_gate::lifecycle::Startup;
use startup_gate::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("startup-gate: {}", e);
            return ExitCode::from(exit_codes::CONFIG);
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("startup-gate: failed to initialize logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "startup-gate starting");

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder unavailable");
    }

    let startup = Startup::new(config, cli.command);
    spawn_signal_listener(startup.shutdown());

    match startup.run().await {
        Ok(code) => {
            tracing::info!(exit_code = code, "startup-gate finished");
            ExitCode::from(u8::try_from(code).unwrap_or(exit_codes::FAILURE))
        }
        Err(e) => {
            tracing::error!(error = %e, cause = %causes(&e), "Startup aborted");
            ExitCode::from(e.exit_code())
        }
    }
}

fn causes(error: &dyn Error) -> String {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Gate → Migrations (migrations.rs) → Status listener → Application (app.rs)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → cancel gate / kill child → stop status listener → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing listens until the dependency is ready
//! - Child processes (migrations, application) run without a shell
//! - The application's exit code becomes the process exit code

pub mod app;
pub mod migrations;
pub mod process;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Startup, StartupError};

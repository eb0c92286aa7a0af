//! Startup readiness gate.
//!
//! Holds an application back until the database it depends on accepts
//! connections, optionally applies migrations, then starts the application.

pub mod cli;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod target;

pub use config::GateConfig;
pub use gate::{GateError, GateReport, ReadinessGate, RetryPolicy};
pub use lifecycle::{Shutdown, Startup};
pub use probe::{AnyProbe, Probe, ProbeError};
pub use target::ConnectionDescriptor;

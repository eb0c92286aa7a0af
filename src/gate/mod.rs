//! Startup readiness gate.
//!
//! # Data Flow
//! ```text
//! RetryPolicy + Probe
//!     → readiness.rs (probe, log, sleep, repeat)
//!     → state.rs (attempt counter, phase)
//!     → Ok(GateReport) | Err(GateError::Exhausted | Cancelled)
//! ```
//!
//! # Design Decisions
//! - Fixed delay between attempts, no backoff or jitter
//! - No delay after the final failed attempt
//! - Exhaustion is fatal: callers abort startup instead of serving
//! - Nothing listens for traffic while the gate is probing

pub mod readiness;
pub mod state;

pub use readiness::{GateError, GateReport, GateResult, ReadinessGate, RetryPolicy};
pub use state::{AttemptState, GatePhase};

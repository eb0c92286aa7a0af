//! HTTP status subsystem.
//!
//! # Data Flow
//! ```text
//! GateReport (only exists once the gate is Ready)
//!     → server.rs (StatusServer: /health, /ready, /metrics)
//!     → request.rs (request ID generation)
//! ```

pub mod request;
pub mod server;

pub use server::StatusServer;

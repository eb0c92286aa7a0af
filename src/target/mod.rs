//! Target dependency description.
//!
//! # Data Flow
//! ```text
//! connection string (config / env / CLI)
//!     → descriptor.rs (parse keyword, URL or bare form)
//!     → ConnectionDescriptor (host, port, redacted identity)
//!     → probe subsystem
//! ```

pub mod descriptor;

pub use descriptor::{ConnectionDescriptor, DescriptorError, DEFAULT_PORT};

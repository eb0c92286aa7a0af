//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (STARTUP_GATE_*, ConnectionStrings__DefaultConnection)
//!     → command line overrides
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the gate runs once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, read_config, ConfigError};
pub use schema::GateConfig;
pub use schema::LogFormat;
pub use schema::MigrationConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::RetryConfig;
pub use schema::StatusConfig;
pub use validation::{validate_config, ValidationError};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate, probes and status server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Container log driver (stdout, pretty or JSON)
//!     → GET /metrics on the status server (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every gate event carries the dependency, attempt index and budget as fields
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;

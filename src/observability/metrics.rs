//! Metrics collection and exposition.
//!
//! # Metrics
//! - `startup_gate_probe_attempts_total` (counter): probes by outcome
//! - `startup_gate_probe_duration_seconds` (histogram): probe latency
//! - `startup_gate_phase` (gauge): 0=probing, 1=ready, 2=exhausted, 3=cancelled
//! - `startup_gate_http_requests_total` (counter): status server requests by path, status
//!
//! # Design Decisions
//! - The Prometheus recorder is installed without its own HTTP listener;
//!   rendering happens on the status server, which only binds after readiness
//! - Recording is a no-op until a recorder is installed (tests, library use)

use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::gate::GatePhase;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(HANDLE.get_or_init(|| handle).clone())
}

/// Render the current metrics in Prometheus text format.
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

pub fn record_probe(success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("startup_gate_probe_attempts_total", "outcome" => outcome).increment(1);
    metrics::histogram!("startup_gate_probe_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_phase(phase: GatePhase) {
    metrics::gauge!("startup_gate_phase").set(phase.as_gauge());
}

pub fn record_http_request(path: &str, status: u16) {
    metrics::counter!(
        "startup_gate_http_requests_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

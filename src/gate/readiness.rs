//! The readiness retry loop.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::RetryConfig;
use crate::gate::state::{AttemptState, GatePhase};
use crate::observability::metrics;
use crate::probe::{Probe, ProbeError};

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Build from validated configuration; a zero budget is bumped to one.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: NonZeroU32::new(config.max_attempts).unwrap_or(NonZeroU32::MIN),
            delay: config.delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Summary of a successful gate run.
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    pub target: String,
    pub phase: GatePhase,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Terminal failures of the gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// Every permitted probe failed.
    #[error("{target} did not become reachable within {attempts} attempts")]
    Exhausted {
        target: String,
        attempts: u32,
        #[source]
        last_error: Option<ProbeError>,
    },

    /// A shutdown signal arrived before the target became reachable.
    #[error("readiness gate for {target} cancelled after {attempts} attempts")]
    Cancelled { target: String, attempts: u32 },
}

impl GateError {
    pub fn phase(&self) -> GatePhase {
        match self {
            GateError::Exhausted { .. } => GatePhase::Exhausted,
            GateError::Cancelled { .. } => GatePhase::Cancelled,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            GateError::Exhausted { attempts, .. } | GateError::Cancelled { attempts, .. } => *attempts,
        }
    }
}

pub type GateResult<T> = Result<T, GateError>;

/// Blocks startup until `probe` succeeds or the retry budget is spent.
///
/// No delay follows the final failed attempt: `N` failures cost exactly
/// `(N - 1) * delay` of waiting.
pub struct ReadinessGate<P> {
    probe: P,
    policy: RetryPolicy,
}

impl<P: Probe> ReadinessGate<P> {
    pub fn new(probe: P, policy: RetryPolicy) -> Self {
        Self { probe, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Probe until ready or exhausted.
    pub async fn wait(&self) -> GateResult<GateReport> {
        self.wait_until(std::future::pending()).await
    }

    /// Like [`wait`](Self::wait), but gives up with [`GateError::Cancelled`]
    /// as soon as `shutdown` resolves.
    pub async fn wait_until(&self, shutdown: impl Future<Output = ()>) -> GateResult<GateReport> {
        tokio::pin!(shutdown);

        let started = Instant::now();
        let mut state = AttemptState::new(self.probe.target(), self.policy.max_attempts, self.policy.delay);
        metrics::record_phase(GatePhase::Probing);

        tracing::info!(
            dependency = %state.target(),
            max_attempts = state.max_attempts(),
            delay_ms = state.delay().as_millis() as u64,
            "Waiting for dependency"
        );

        let mut last_error = None;
        while let Some(attempt) = state.begin_attempt() {
            let probe_started = Instant::now();
            let outcome = tokio::select! {
                outcome = self.probe.probe() => outcome,
                _ = &mut shutdown => return Err(cancelled(&state)),
            };
            metrics::record_probe(outcome.is_ok(), probe_started.elapsed());

            match outcome {
                Ok(()) => {
                    let report = GateReport {
                        target: state.target().to_string(),
                        phase: GatePhase::Ready,
                        attempts: attempt,
                        max_attempts: state.max_attempts(),
                        elapsed: started.elapsed(),
                    };
                    metrics::record_phase(GatePhase::Ready);
                    tracing::info!(
                        dependency = %report.target,
                        attempt,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "Dependency is ready"
                    );
                    return Ok(report);
                }
                Err(error) => {
                    tracing::warn!(
                        dependency = %state.target(),
                        attempt,
                        max_attempts = state.max_attempts(),
                        error = %error,
                        "Dependency not reachable"
                    );

                    if state.is_exhausted() {
                        last_error = Some(error);
                        break;
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(state.delay()) => {}
                        _ = &mut shutdown => return Err(cancelled(&state)),
                    }
                }
            }
        }

        metrics::record_phase(GatePhase::Exhausted);
        tracing::error!(
            dependency = %state.target(),
            attempts = state.attempts(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dependency never became reachable, giving up"
        );

        Err(GateError::Exhausted {
            target: state.target().to_string(),
            attempts: state.attempts(),
            last_error,
        })
    }
}

fn cancelled(state: &AttemptState) -> GateError {
    metrics::record_phase(GatePhase::Cancelled);
    tracing::warn!(dependency = %state.target(), attempts = state.attempts(), "Readiness gate cancelled");
    GateError::Cancelled {
        target: state.target().to_string(),
        attempts: state.attempts(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::Level;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Fails until call number `succeed_on` (never, if `None`).
    struct ScriptedProbe {
        calls: Arc<AtomicU32>,
        succeed_on: Option<u32>,
    }

    impl ScriptedProbe {
        fn new(succeed_on: Option<u32>) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (Self { calls: calls.clone(), succeed_on }, calls)
        }
    }

    impl Probe for ScriptedProbe {
        async fn probe(&self) -> Result<(), ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.succeed_on {
                Some(k) if call >= k => Ok(()),
                _ => Err(ProbeError::Connect(io::Error::from(io::ErrorKind::ConnectionRefused))),
            }
        }

        fn target(&self) -> String {
            "db:3306".into()
        }
    }

    /// Records `(level, attempt)` for every event carrying an `attempt` field.
    #[derive(Clone, Default)]
    struct AttemptLog(Arc<Mutex<Vec<(Level, u64)>>>);

    struct AttemptField(Option<u64>);

    impl Visit for AttemptField {
        fn record_u64(&mut self, field: &Field, value: u64) {
            if field.name() == "attempt" {
                self.0 = Some(value);
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: tracing::Subscriber> Layer<S> for AttemptLog {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut field = AttemptField(None);
            event.record(&mut field);
            if let Some(attempt) = field.0 {
                self.0.lock().unwrap().push((*event.metadata().level(), attempt));
            }
        }
    }

    impl AttemptLog {
        fn entries(&self) -> Vec<(Level, u64)> {
            self.0.lock().unwrap().clone()
        }
    }

    fn policy(max: u32, delay_secs: u64) -> RetryPolicy {
        RetryPolicy::new(NonZeroU32::new(max).unwrap(), Duration::from_secs(delay_secs))
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_three_attempts() {
        let (probe, calls) = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe, policy(3, 1));

        let started = tokio::time::Instant::now();
        let err = gate.wait().await.unwrap_err();

        assert!(matches!(err, GateError::Exhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two gaps between three attempts, none after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_third_attempt() {
        let (probe, calls) = ScriptedProbe::new(Some(3));
        let gate = ReadinessGate::new(probe, policy(5, 1));

        let started = tokio::time::Instant::now();
        let report = gate.wait().await.unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.phase, GatePhase::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_has_no_delay() {
        let (probe, calls) = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe, policy(1, 30));

        let started = tokio::time::Instant::now();
        let err = gate.wait().await.unwrap_err();

        assert_eq!(err.attempts(), 1);
        assert_eq!(err.phase(), GatePhase::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_skips_delay() {
        let (probe, calls) = ScriptedProbe::new(Some(1));
        let gate = ReadinessGate::new(probe, policy(30, 5));

        let started = tokio::time::Instant::now();
        let report = gate.wait().await.unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_attempts_count_up_to_budget() {
        let log = AttemptLog::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

        let (probe, _) = ScriptedProbe::new(None);
        ReadinessGate::new(probe, policy(4, 1)).wait().await.unwrap_err();

        let expected: Vec<_> = (1..=4).map(|n| (Level::WARN, n)).collect();
        assert_eq!(log.entries(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_attempts_stop_at_success() {
        let log = AttemptLog::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

        let (probe, _) = ScriptedProbe::new(Some(3));
        ReadinessGate::new(probe, policy(5, 1)).wait().await.unwrap();

        assert_eq!(
            log.entries(),
            vec![(Level::WARN, 1), (Level::WARN, 2), (Level::INFO, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_keeps_last_probe_error() {
        let (probe, _) = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe, policy(2, 1));

        match gate.wait().await {
            Err(GateError::Exhausted { target, last_error, .. }) => {
                assert_eq!(target, "db:3306");
                assert!(matches!(last_error, Some(ProbeError::Connect(_))));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_during_delay() {
        let (probe, calls) = ScriptedProbe::new(None);
        let gate = ReadinessGate::new(probe, policy(30, 5));

        let shutdown = tokio::time::sleep(Duration::from_secs(7));
        let err = gate.wait_until(shutdown).await.unwrap_err();

        assert!(matches!(err, GateError::Cancelled { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = RetryConfig::default();
        assert_eq!(RetryPolicy::from_config(&config), policy(30, 5));

        config.max_attempts = 0;
        config.delay_ms = Some(250);
        let p = RetryPolicy::from_config(&config);
        assert_eq!(p.max_attempts.get(), 1);
        assert_eq!(p.delay, Duration::from_millis(250));
    }
}

//! Gate state.
//!
//! # States
//! - Probing: initial, probes are being attempted
//! - Ready: a probe succeeded (terminal)
//! - Exhausted: the attempt budget ran out (terminal)
//! - Cancelled: a shutdown signal arrived while probing (terminal)
//!
//! # State Transitions
//! ```text
//! Probing → Probing:   probe failed, attempts remain
//! Probing → Ready:     probe succeeded
//! Probing → Exhausted: probe failed, attempts == max_attempts
//! ```

use std::num::NonZeroU32;
use std::time::Duration;

use serde::Serialize;

/// Phase of a single gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePhase {
    Probing,
    Ready,
    Exhausted,
    Cancelled,
}

impl GatePhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GatePhase::Probing)
    }

    pub(crate) fn as_gauge(self) -> f64 {
        match self {
            GatePhase::Probing => 0.0,
            GatePhase::Ready => 1.0,
            GatePhase::Exhausted => 2.0,
            GatePhase::Cancelled => 3.0,
        }
    }
}

/// Attempt bookkeeping for one gate run.
///
/// Lives only for the duration of [`ReadinessGate::wait`](crate::gate::ReadinessGate::wait).
/// `attempts <= max_attempts` holds at all times: once the budget is spent
/// [`begin_attempt`](Self::begin_attempt) refuses to count further.
#[derive(Debug)]
pub struct AttemptState {
    target: String,
    attempts: u32,
    max_attempts: NonZeroU32,
    delay: Duration,
}

impl AttemptState {
    pub fn new(target: String, max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self {
            target,
            attempts: 0,
            max_attempts,
            delay,
        }
    }

    /// Count a new attempt, returning its 1-based index.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts.get()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

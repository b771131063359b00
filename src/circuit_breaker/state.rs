//! Circuit breaker state and outcome counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Circuit is closed; requests pass through normally.
    #[default]
    Closed,
    /// Circuit is open; requests are rejected.
    Open,
    /// Circuit is half-open; a bounded number of probes are let through.
    HalfOpen,
}

impl BreakerState {
    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }

    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters describing recent call outcomes.
///
/// A single outcome increments `requests` and exactly one of `successes`
/// or `failures`, so `requests == successes + failures` in every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Number of recorded outcomes.
    pub requests: u64,
    /// Number of successful outcomes.
    pub successes: u64,
    /// Number of failed outcomes.
    pub failures: u64,
    /// Length of the current run of failures.
    pub consecutive_failures: u64,
    /// When the most recent failure was recorded.
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl Metrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful outcome.
    pub fn record_success(&mut self) {
        self.requests += 1;
        self.successes += 1;
        self.consecutive_failures = 0;
    }

    /// Records a failed outcome observed at `at`.
    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.requests += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_failure_time = Some(at);
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.requests == 0
    }

    /// Returns the success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            return 1.0;
        }
        self.successes as f64 / self.requests as f64
    }

    /// Returns the failure rate (0.0 to 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.failures as f64 / self.requests as f64
    }
}

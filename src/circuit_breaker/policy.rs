//! Trip policies deciding when a closed circuit opens.

use crate::circuit_breaker::state::Metrics;

/// Decides whether a closed circuit should trip.
///
/// Evaluated inside the breaker's critical section right after a failure
/// is recorded, so it always sees the updated counters. Implementations
/// must be cheap and must not block.
///
/// Any `Fn(&Metrics) -> bool` closure is a policy:
///
/// ```rust
/// use breakwater::circuit_breaker::{Metrics, TripPolicy};
///
/// let policy = |m: &Metrics| m.failures >= 10;
/// assert!(!policy.should_trip(&Metrics::default()));
/// ```
pub trait TripPolicy: Send + Sync {
    /// Returns `true` if the circuit should open.
    fn should_trip(&self, metrics: &Metrics) -> bool;

    /// Short description used in `Debug` output and logs.
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> TripPolicy for F
where
    F: Fn(&Metrics) -> bool + Send + Sync,
{
    fn should_trip(&self, metrics: &Metrics) -> bool {
        self(metrics)
    }
}

/// Trips after a run of consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveFailures(pub u64);

impl Default for ConsecutiveFailures {
    fn default() -> Self {
        Self(5)
    }
}

impl TripPolicy for ConsecutiveFailures {
    fn should_trip(&self, metrics: &Metrics) -> bool {
        metrics.consecutive_failures >= self.0
    }

    fn describe(&self) -> String {
        format!("consecutive_failures >= {}", self.0)
    }
}

/// Trips when the failure rate reaches a threshold.
///
/// Nothing trips until at least `minimum_requests` outcomes are recorded.
/// Pair it with a `closed_interval` on the config to judge recent traffic
/// rather than the whole lifetime of the circuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRate {
    /// Failure rate (0.0 to 1.0) at which to trip.
    pub threshold: f64,
    /// Minimum number of recorded outcomes before the rate is considered.
    pub minimum_requests: u64,
}

impl FailureRate {
    /// Creates a failure-rate policy.
    pub fn new(threshold: f64, minimum_requests: u64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            minimum_requests,
        }
    }
}

impl TripPolicy for FailureRate {
    fn should_trip(&self, metrics: &Metrics) -> bool {
        metrics.requests >= self.minimum_requests.max(1)
            && metrics.failure_rate() >= self.threshold
    }

    fn describe(&self) -> String {
        format!(
            "failure_rate >= {:.2} over >= {} requests",
            self.threshold, self.minimum_requests
        )
    }
}

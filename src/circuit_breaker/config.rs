//! Circuit breaker configuration.

use crate::circuit_breaker::policy::{ConsecutiveFailures, TripPolicy};
use crate::circuit_breaker::state::{BreakerState, Metrics};
use crate::core::{Clock, ConfigError, SystemClock};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Observer invoked after every actual state transition.
///
/// Arguments are the breaker name, the previous state and the new state.
/// It runs outside the breaker's critical section, so it may read the
/// breaker. A panic inside the hook is logged and otherwise ignored.
///
/// Transitions are totally ordered inside the breaker, but two transitions
/// made from different tasks at nearly the same moment can reach the hook
/// in the opposite order. Use `from` to detect this.
pub type StateChangeHook = Arc<dyn Fn(&str, BreakerState, BreakerState) + Send + Sync>;

/// Configuration for a circuit breaker.
///
/// Immutable once handed to [`CircuitBreaker::new`](crate::CircuitBreaker::new).
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Name reported in errors, logs and state-change notifications.
    pub name: String,

    /// Maximum number of concurrent probes admitted while half-open.
    pub max_half_open_requests: u32,

    /// How long to stay open before admitting the first probe.
    pub open_timeout: Duration,

    /// Statistical window for the closed state.
    ///
    /// When set, closed-state metrics are reset once this much time has
    /// passed since the window started. `None` keeps counting until the
    /// next trip.
    pub closed_interval: Option<Duration>,

    /// Decides when a closed circuit trips.
    pub trip_policy: Arc<dyn TripPolicy>,

    /// Observer for state transitions.
    pub on_state_change: Option<StateChangeHook>,

    /// Time source for recovery timing.
    pub clock: Arc<dyn Clock>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "circuit-breaker".to_string(),
            max_half_open_requests: 1,
            open_timeout: Duration::from_secs(30),
            closed_interval: None,
            trip_policy: Arc::new(ConsecutiveFailures::default()),
            on_state_change: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the breaker name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the maximum number of half-open probes.
    pub fn with_max_half_open_requests(mut self, max: u32) -> Self {
        self.max_half_open_requests = max;
        self
    }

    /// Sets the open timeout.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the closed-state statistical window.
    pub fn with_closed_interval(mut self, interval: Duration) -> Self {
        self.closed_interval = Some(interval);
        self
    }

    /// Sets the trip policy.
    pub fn with_trip_policy<P: TripPolicy + 'static>(mut self, policy: P) -> Self {
        self.trip_policy = Arc::new(policy);
        self
    }

    /// Sets the trip predicate from a closure.
    pub fn with_ready_to_trip<F>(mut self, ready_to_trip: F) -> Self
    where
        F: Fn(&Metrics) -> bool + Send + Sync + 'static,
    {
        self.trip_policy = Arc::new(ready_to_trip);
        self
    }

    /// Sets the state-change observer.
    pub fn with_on_state_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, BreakerState, BreakerState) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Sets the clock.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Creates a configuration that trips early and recovers slowly.
    ///
    /// - Trips after 3 consecutive failures
    /// - Stays open for 60 seconds
    /// - Admits a single probe
    pub fn strict() -> Self {
        Self {
            max_half_open_requests: 1,
            open_timeout: Duration::from_secs(60),
            trip_policy: Arc::new(ConsecutiveFailures(3)),
            ..Self::default()
        }
    }

    /// Creates a configuration that tolerates more failures and probes sooner.
    ///
    /// - Trips after 10 consecutive failures
    /// - Stays open for 10 seconds
    /// - Admits up to 3 concurrent probes
    pub fn high_availability() -> Self {
        Self {
            max_half_open_requests: 3,
            open_timeout: Duration::from_secs(10),
            trip_policy: Arc::new(ConsecutiveFailures(10)),
            ..Self::default()
        }
    }

    /// Checks the configuration for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if self.max_half_open_requests < 1 {
            return Err(ConfigError::invalid(
                "max_half_open_requests",
                "must be at least 1",
            ));
        }
        if self.closed_interval == Some(Duration::ZERO) {
            return Err(ConfigError::invalid("closed_interval", "must be non-zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("name", &self.name)
            .field("max_half_open_requests", &self.max_half_open_requests)
            .field("open_timeout", &self.open_timeout)
            .field("closed_interval", &self.closed_interval)
            .field("trip_policy", &self.trip_policy.describe())
            .field("on_state_change", &self.on_state_change.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

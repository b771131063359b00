//! Circuit breaker implementation.

use crate::audit::{self, StateChangeEvent};
use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::execution;
use crate::circuit_breaker::state::{BreakerState, Metrics};
use crate::core::{BreakerError, ConfigError};
use crate::operation::Operation;

use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A circuit breaker guarding calls to one unreliable dependency.
///
/// The breaker monitors outcomes and prevents cascading failures by
/// temporarily rejecting calls to an unhealthy dependency.
///
/// # States
///
/// - **Closed**: Normal operation. Calls pass through, outcomes are counted.
/// - **Open**: The dependency is failing. Calls are rejected immediately.
/// - **Half-Open**: Probing. A bounded number of calls are let through to
///   test whether the dependency has recovered.
///
/// `CircuitBreaker` is a cheap handle; clones share the same state.
///
/// # Example
///
/// ```rust
/// use breakwater::{CircuitBreaker, CircuitBreakerConfig};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CircuitBreakerConfig::default()
///     .with_name("inventory")
///     .with_ready_to_trip(|m| m.consecutive_failures >= 3)
///     .with_open_timeout(Duration::from_secs(10));
/// let breaker = CircuitBreaker::new(config)?;
///
/// let token = CancellationToken::new();
/// let stock = breaker
///     .execute(&token, |_cancel: CancellationToken| async { Ok::<_, std::io::Error>(12) })
///     .await?;
/// assert_eq!(stock, 12);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

struct Shared {
    config: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
}

/// Everything guarded by the breaker's single critical section.
#[derive(Debug)]
struct BreakerCore {
    state: BreakerState,
    metrics: Metrics,
    last_state_change: Instant,
    half_open_in_flight: u32,
    /// Bumped on every transition; ties a permit to the state it was issued in.
    generation: u64,
    closed_window_start: Instant,
}

/// Proof of admission, carried by the spawned operation.
#[derive(Debug, Clone, Copy)]
struct Permit {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Open { retry_after: Duration },
    TooManyRequests,
}

#[derive(Debug, Clone)]
struct Transition {
    from: BreakerState,
    to: BreakerState,
    metrics: Metrics,
}

impl BreakerCore {
    fn new(now: Instant) -> Self {
        Self {
            state: BreakerState::Closed,
            metrics: Metrics::new(),
            last_state_change: now,
            half_open_in_flight: 0,
            generation: 0,
            closed_window_start: now,
        }
    }

    /// Decides whether a call may run.
    ///
    /// The Open -> HalfOpen move and the claim of the first probe slot
    /// happen in the same step.
    fn admit(
        &mut self,
        config: &CircuitBreakerConfig,
        now: Instant,
    ) -> (Result<Permit, Rejection>, Option<Transition>) {
        match self.state {
            BreakerState::Closed => {
                self.roll_closed_window(config, now);
                (Ok(self.permit()), None)
            }

            BreakerState::Open => {
                let elapsed = now.saturating_duration_since(self.last_state_change);
                if elapsed >= config.open_timeout {
                    let transition = self.transition(BreakerState::HalfOpen, now);
                    self.half_open_in_flight += 1;
                    (Ok(self.permit()), transition)
                } else {
                    let retry_after = config.open_timeout - elapsed;
                    (Err(Rejection::Open { retry_after }), None)
                }
            }

            BreakerState::HalfOpen => {
                if self.half_open_in_flight < config.max_half_open_requests {
                    self.half_open_in_flight += 1;
                    (Ok(self.permit()), None)
                } else {
                    (Err(Rejection::TooManyRequests), None)
                }
            }
        }
    }

    /// Records an outcome and applies whatever transition it triggers.
    fn record(
        &mut self,
        config: &CircuitBreakerConfig,
        permit: Permit,
        success: bool,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Option<Transition> {
        if self.state.is_closed() {
            self.roll_closed_window(config, now);
        }

        if success {
            self.metrics.record_success();
        } else {
            self.metrics.record_failure(wall);
        }

        match self.state {
            BreakerState::Closed if !success && config.trip_policy.should_trip(&self.metrics) => {
                self.transition(BreakerState::Open, now)
            }
            // Only probes admitted in this half-open window decide its fate.
            BreakerState::HalfOpen if permit.generation == self.generation => {
                let target = if success {
                    BreakerState::Closed
                } else {
                    BreakerState::Open
                };
                self.transition(target, now)
            }
            _ => None,
        }
    }

    /// Moves to `to`. Requesting the current state is a no-op.
    fn transition(&mut self, to: BreakerState, now: Instant) -> Option<Transition> {
        if self.state == to {
            return None;
        }

        let from = self.state;
        let metrics = self.metrics.clone();
        self.state = to;
        self.last_state_change = now;
        self.generation += 1;

        match to {
            BreakerState::HalfOpen => self.half_open_in_flight = 0,
            BreakerState::Closed => {
                self.metrics = Metrics::new();
                self.closed_window_start = now;
            }
            BreakerState::Open => {}
        }

        Some(Transition { from, to, metrics })
    }

    fn roll_closed_window(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        if let Some(interval) = config.closed_interval {
            if now.saturating_duration_since(self.closed_window_start) >= interval {
                self.metrics = Metrics::new();
                self.closed_window_start = now;
            }
        }
    }

    fn permit(&self) -> Permit {
        Permit {
            generation: self.generation,
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit(&self) -> Result<Permit, Rejection> {
        let now = self.config.clock.now();
        let (decision, transition) = self.lock().admit(&self.config, now);
        if let Some(transition) = transition {
            self.notify(transition);
        }
        decision
    }

    fn record(&self, permit: Permit, success: bool) {
        let now = self.config.clock.now();
        let wall = self.config.clock.wall_time();
        let transition = self.lock().record(&self.config, permit, success, now, wall);
        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    /// Reports a transition. Runs outside the critical section.
    fn notify(&self, transition: Transition) {
        let event = StateChangeEvent::new(
            self.config.name.as_str(),
            transition.from,
            transition.to,
            transition.metrics,
            self.config.clock.wall_time(),
        );
        audit::emit_state_change(&event);

        if let Some(hook) = &self.config.on_state_change {
            let observed = panic::catch_unwind(AssertUnwindSafe(|| {
                hook(&self.config.name, transition.from, transition.to)
            }));
            // The hook never decides the caller's result.
            if observed.is_err() {
                tracing::error!(
                    breaker = %self.config.name,
                    from = %transition.from,
                    to = %transition.to,
                    "State change hook panicked"
                );
            }
        }
    }
}

impl CircuitBreaker {
    /// Creates a new circuit breaker with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration fails validation.
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::debug!(
            breaker = %config.name,
            max_half_open_requests = config.max_half_open_requests,
            open_timeout_ms = u64::try_from(config.open_timeout.as_millis()).unwrap_or(u64::MAX),
            trip_policy = %config.trip_policy.describe(),
            "Circuit breaker created"
        );

        Ok(Self::from_validated(config))
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::from_validated(CircuitBreakerConfig::default())
    }

    fn from_validated(config: CircuitBreakerConfig) -> Self {
        let now = config.clock.now();
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(BreakerCore::new(now)),
                config,
            }),
        }
    }

    /// Returns the breaker name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Returns the current state of the circuit breaker.
    pub fn state(&self) -> BreakerState {
        self.shared.lock().state
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> Metrics {
        self.shared.lock().metrics.clone()
    }

    /// Runs `operation` through the breaker.
    ///
    /// The call is admitted or rejected synchronously. An admitted operation
    /// runs in its own task and is raced against `cancel`; the token is also
    /// handed to the operation so it may stop early if it wants to.
    ///
    /// # Errors
    ///
    /// - [`BreakerError::CircuitOpen`] / [`BreakerError::TooManyRequests`]:
    ///   rejected, the operation was never invoked.
    /// - [`BreakerError::Cancelled`]: `cancel` fired first. An admitted
    ///   operation keeps running and its outcome is still recorded.
    /// - [`BreakerError::Panicked`]: the operation panicked.
    /// - [`BreakerError::Operation`]: the operation's own error, unchanged.
    pub async fn execute<O>(
        &self,
        cancel: &CancellationToken,
        operation: O,
    ) -> Result<O::Output, BreakerError<O::Error>>
    where
        O: Operation,
    {
        if cancel.is_cancelled() {
            audit::emit_cancellation(self.name(), false);
            return Err(BreakerError::Cancelled);
        }

        let permit = match self.shared.admit() {
            Ok(permit) => permit,
            Err(rejection) => return Err(self.reject(rejection)),
        };

        let shared = Arc::clone(&self.shared);
        let completion = execution::spawn_operation(operation, cancel.clone(), move |success| {
            shared.record(permit, success)
        });

        let result = execution::await_completion(completion, cancel).await;
        if matches!(result, Err(BreakerError::Cancelled)) {
            audit::emit_cancellation(self.name(), true);
        }
        result
    }

    /// Runs `operation` through the breaker without a cancellation signal.
    pub async fn call<O>(&self, operation: O) -> Result<O::Output, BreakerError<O::Error>>
    where
        O: Operation,
    {
        self.execute(&CancellationToken::new(), operation).await
    }

    fn reject<E>(&self, rejection: Rejection) -> BreakerError<E> {
        match rejection {
            Rejection::Open { retry_after } => {
                audit::emit_rejection(self.name(), BreakerState::Open, Some(retry_after));
                BreakerError::circuit_open(self.name(), retry_after)
            }
            Rejection::TooManyRequests => {
                audit::emit_rejection(self.name(), BreakerState::HalfOpen, None);
                BreakerError::too_many_requests(
                    self.name(),
                    self.shared.config.max_half_open_requests,
                )
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .field("metrics", &self.metrics())
            .field("config", &self.shared.config)
            .finish()
    }
}

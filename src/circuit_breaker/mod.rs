//! Circuit breaker state machine and configuration.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! stopping traffic to a failing dependency and periodically probing it to
//! detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through and outcomes are counted.
//! - **Open**: The dependency is failing; calls are rejected immediately.
//! - **Half-Open**: A bounded number of probe calls test for recovery.
//!
//! ## Usage
//!
//! ```rust
//! use breakwater::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, ConsecutiveFailures};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::default()
//!     .with_name("payments")
//!     .with_trip_policy(ConsecutiveFailures(5))
//!     .with_open_timeout(Duration::from_secs(30));
//!
//! let breaker = CircuitBreaker::new(config).unwrap();
//! assert!(breaker.state().is_closed());
//! ```

mod breaker;
mod config;
mod execution;
mod policy;
mod state;

pub use breaker::CircuitBreaker;
pub use config::{CircuitBreakerConfig, StateChangeHook};
pub use policy::{ConsecutiveFailures, FailureRate, TripPolicy};
pub use state::{BreakerState, Metrics};

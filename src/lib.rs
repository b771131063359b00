//! # Breakwater
//!
//! An async circuit breaker for calls to unreliable dependencies.
//!
//! ## Overview
//!
//! A [`CircuitBreaker`] sits in front of a remote service, database, or any
//! other dependency that can fail. It allows you to:
//!
//! - Count successes and failures of every call it lets through
//! - Stop calling a dependency once a [`TripPolicy`] decides it is unhealthy
//! - Probe the dependency with a bounded number of calls after a cool-down
//! - Abandon a slow call through a [`CancellationToken`] without losing its
//!   outcome
//! - Observe state transitions through a hook and structured audit events
//!
//! ## Quick Start
//!
//! ```rust
//! use breakwater::{BreakerError, CircuitBreaker, CircuitBreakerConfig};
//! use breakwater::operation::MockOperation;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CircuitBreakerConfig::default()
//!         .with_name("inventory")
//!         .with_ready_to_trip(|m| m.consecutive_failures >= 3)
//!         .with_open_timeout(Duration::from_secs(30));
//!     let breaker = CircuitBreaker::new(config)?;
//!
//!     match breaker.call(MockOperation::new()).await {
//!         Ok(value) => println!("got {value}"),
//!         Err(BreakerError::CircuitOpen { retry_after, .. }) => {
//!             println!("dependency unavailable, retry in {retry_after:?}")
//!         }
//!         Err(e) => println!("call failed: {e}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Error types and injectable clocks
//! - **Circuit Breaker**: The state machine, its configuration and trip policies
//! - **Operation**: The unit of work a breaker protects
//! - **Audit**: Structured events for state changes and rejections

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod circuit_breaker;
pub mod core;
pub mod operation;

// Re-export commonly used types at the crate root
pub use crate::core::{BreakerError, BreakerResult, Clock, ConfigError, ManualClock, SystemClock};

pub use crate::circuit_breaker::{
    BreakerState, CircuitBreaker, CircuitBreakerConfig, ConsecutiveFailures, FailureRate,
    Metrics, StateChangeHook, TripPolicy,
};
pub use crate::operation::Operation;

pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports.
///
/// ```rust
/// use breakwater::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{
        BreakerState, CircuitBreaker, CircuitBreakerConfig, ConsecutiveFailures, FailureRate,
        Metrics, TripPolicy,
    };
    pub use crate::core::{BreakerError, ConfigError};
    pub use crate::operation::Operation;
    pub use tokio_util::sync::CancellationToken;
}

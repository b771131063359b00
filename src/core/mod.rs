//! Core types shared across the library.
//!
//! - [`error`] - Structured error types
//! - [`clock`] - Injectable time sources

pub mod clock;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerError, BreakerResult, ConfigError, ConfigResult};

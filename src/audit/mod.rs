//! Structured audit logging for breaker activity.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate. Events can be captured by any tracing
//! subscriber (JSON file, OpenTelemetry, etc.) under the
//! `breakwater::audit` target.

mod events;

pub use events::{
    emit_cancellation, emit_rejection, emit_state_change, AuditEvent, StateChangeEvent,
};

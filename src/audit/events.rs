//! Audit event types and emission functions.

use crate::circuit_breaker::{BreakerState, Metrics};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    /// Unique event ID.
    pub event_id: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Name of the breaker.
    pub breaker: String,

    /// State before the transition.
    pub from: BreakerState,

    /// State after the transition.
    pub to: BreakerState,

    /// Metrics as they were just before the transition applied any reset.
    pub metrics: Metrics,
}

impl StateChangeEvent {
    /// Creates a new event stamped with `timestamp`.
    pub fn new(
        breaker: impl Into<String>,
        from: BreakerState,
        to: BreakerState,
        metrics: Metrics,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            breaker: breaker.into(),
            from,
            to,
            metrics,
        }
    }

    /// Returns `true` if this transition tripped or re-opened the circuit.
    pub fn is_trip(&self) -> bool {
        self.to.is_open()
    }
}

impl AuditEvent for StateChangeEvent {
    fn event_type(&self) -> &'static str {
        "state_change"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a state transition.
pub fn emit_state_change(event: &StateChangeEvent) {
    if event.is_trip() {
        tracing::warn!(
            target: "breakwater::audit",
            event_type = event.event_type(),
            event_id = %event.event_id,
            breaker = %event.breaker,
            from = %event.from,
            to = %event.to,
            requests = event.metrics.requests,
            failures = event.metrics.failures,
            consecutive_failures = event.metrics.consecutive_failures,
            "Circuit opened"
        );
    } else {
        tracing::info!(
            target: "breakwater::audit",
            event_type = event.event_type(),
            event_id = %event.event_id,
            breaker = %event.breaker,
            from = %event.from,
            to = %event.to,
            requests = event.metrics.requests,
            failures = event.metrics.failures,
            "Circuit state changed"
        );
    }
}

/// Emits an audit event for a call rejected without running the operation.
pub fn emit_rejection(breaker: &str, state: BreakerState, retry_after: Option<Duration>) {
    tracing::debug!(
        target: "breakwater::audit",
        event_type = "call_rejected",
        breaker = %breaker,
        state = %state,
        retry_after_ms = retry_after.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        "Call rejected"
    );
}

/// Emits an audit event for a caller that stopped waiting.
pub fn emit_cancellation(breaker: &str, admitted: bool) {
    tracing::debug!(
        target: "breakwater::audit",
        event_type = "call_cancelled",
        breaker = %breaker,
        admitted = admitted,
        "Caller cancelled; outcome will still be recorded if the operation was admitted"
    );
}

//! Outbound application events and the operator status view.
//!
//! [`GateService`](super::service::GateService) emits [`GateEvent`]s
//! through the [`EventSink`](super::ports::EventSink) port after the
//! change they describe has been persisted.

use serde::Serialize;

use crate::gate::{Actor, ActuationCommand, TargetState, Timestamp, Transition};

/// Structured events emitted by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// An operator changed the target state.
    TransitionRequested(Transition),

    /// The control loop reverted `open_temporary` to `closed`.
    AutoClosed { opened_at: Timestamp, closed_at: Timestamp },

    /// The agent polled and was handed `command`.
    ContactRecorded { host: String, command: ActuationCommand },

    /// A read-modify-write was aborted because the store failed.
    PersistFailed { operation: &'static str, error: String },
}

/// Snapshot of the record for operators and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateStatus {
    pub target_state: TargetState,
    pub command: ActuationCommand,
    /// Present only while `open_temporary`; never negative.
    pub seconds_to_closing: Option<f64>,
    /// Absent until the agent has polled once.
    pub seconds_since_last_contact: Option<f64>,
    /// Newest first.
    pub history: Vec<StatusHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusHistoryEntry {
    pub timestamp: Timestamp,
    pub target_state: TargetState,
    pub actor: Actor,
}

//! Application service: the hexagonal core of the server.
//!
//! [`GateService`] owns the state store behind one mutex.  Every public
//! operation is a single critical section:
//!
//! ```text
//!   lock ──▶ load ──▶ mutate (GateMachine) ──▶ persist ──▶ emit ──▶ unlock
//! ```
//!
//! The Command API, operator actions and the control loop all go through
//! the same section, so no operation can persist over a change it did not
//! observe.  Nothing inside the section touches the network.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::error::{GateError, Result};
use crate::gate::{
    Actor, ActuationCommand, GateMachine, StateRecord, Timestamp, Transition, compute_command,
};
use crate::store::{StateStore, StoreError};

use super::commands::OperatorCommand;
use super::events::{GateEvent, GateStatus, StatusHistoryEntry};
use super::ports::{Clock, EventSink};

// ───────────────────────────────────────────────────────────────
// GateService
// ───────────────────────────────────────────────────────────────

pub struct GateService {
    machine: GateMachine,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

/// Everything that must only be touched inside the critical section.
struct Inner {
    store: StateStore,
    sink: Box<dyn EventSink>,
}

/// Result of a committed read-modify-write.
struct Committed<T> {
    value: T,
    record: StateRecord,
    now: Timestamp,
}

impl GateService {
    pub fn new(
        machine: GateMachine,
        store: StateStore,
        clock: Arc<dyn Clock>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            machine,
            clock,
            inner: Mutex::new(Inner { store, sink }),
        }
    }

    pub fn machine(&self) -> &GateMachine {
        &self.machine
    }

    // ── Command API ───────────────────────────────────────────

    /// Record contact from the agent and hand it the current command.
    ///
    /// The returned command is derived from the record as just persisted.
    pub fn take_command(&self, caller: &str) -> Result<ActuationCommand> {
        let committed = self.transact("take_command", |_, record, now, events| {
            record.last_contact_with_gate = now;
            let command = compute_command(record.target_state);
            events.push(GateEvent::ContactRecorded {
                host: caller.to_owned(),
                command,
            });
            command
        })?;
        Ok(committed.value)
    }

    // ── Operator actions ──────────────────────────────────────

    /// Apply an operator command and return the resulting status view.
    pub fn request(&self, command: OperatorCommand) -> Result<GateStatus> {
        let committed = self.transact(command.name(), |machine, record, now, events| {
            let transition =
                machine.request_transition(record, command.target(), now, Actor::Operator);
            events.push(GateEvent::TransitionRequested(transition));
        })?;
        Ok(self.view(&committed.record, committed.now))
    }

    // ── Control loop ──────────────────────────────────────────

    /// One auto-reversion check.  `Some` when the gate was closed by timeout.
    pub fn control_tick(&self) -> Result<Option<Transition>> {
        let committed = self.transact("control_tick", |machine, record, now, events| {
            let opened_at = record.open_temporary_start;
            let transition = machine.evaluate_timeout(record, now);
            if transition.is_some() {
                events.push(GateEvent::AutoClosed {
                    opened_at,
                    closed_at: now,
                });
            }
            transition
        })?;
        Ok(committed.value)
    }

    // ── Queries ───────────────────────────────────────────────

    /// The current record, read under the same exclusive section.
    pub fn snapshot(&self) -> Result<StateRecord> {
        let mut guard = self.lock();
        let Inner { store, sink } = &mut *guard;
        self.load(store, sink.as_mut(), "snapshot")
    }

    /// Operator/dashboard view of the current record.
    pub fn status(&self) -> Result<GateStatus> {
        let record = self.snapshot()?;
        Ok(self.view(&record, self.clock.now()))
    }

    // ── Internal ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every operation reloads from the store, so state left by a
        // panicked holder is never trusted.
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("GateService: recovering from poisoned lock");
            poisoned.into_inner()
        })
    }

    /// The critical section.  Persists only when `mutate` changed the
    /// record; events are emitted only after a successful persist.
    fn transact<T>(
        &self,
        operation: &'static str,
        mutate: impl FnOnce(&GateMachine, &mut StateRecord, Timestamp, &mut Vec<GateEvent>) -> T,
    ) -> Result<Committed<T>> {
        let mut guard = self.lock();
        let Inner { store, sink } = &mut *guard;
        let now = self.clock.now();

        let mut record = self.load(store, sink.as_mut(), operation)?;
        let before = record.clone();
        let mut events = Vec::new();
        let value = mutate(&self.machine, &mut record, now, &mut events);

        if record != before {
            store
                .save(&record)
                .map_err(|e| Self::abort(sink.as_mut(), operation, e))?;
        }
        for event in &events {
            sink.emit(event);
        }
        Ok(Committed { value, record, now })
    }

    /// Load the record and cut a stored history down to the configured
    /// bound.  The trimmed history is written back with the next change.
    fn load(
        &self,
        store: &StateStore,
        sink: &mut dyn EventSink,
        operation: &'static str,
    ) -> Result<StateRecord> {
        let mut record = store
            .load()
            .map_err(|e| Self::abort(sink, operation, e))?;
        let dropped = record
            .command_history
            .retain_newest(self.machine.history_max_len());
        if dropped > 0 {
            debug!("GateService: dropped {dropped} history entries beyond the configured bound");
        }
        Ok(record)
    }

    fn abort(sink: &mut dyn EventSink, operation: &'static str, error: StoreError) -> GateError {
        sink.emit(&GateEvent::PersistFailed {
            operation,
            error: error.to_string(),
        });
        GateError::Store(error)
    }

    fn view(&self, record: &StateRecord, now: Timestamp) -> GateStatus {
        GateStatus {
            target_state: record.target_state,
            command: compute_command(record.target_state),
            seconds_to_closing: self
                .machine
                .closes_at(record)
                .map(|at| (at - now).max(0.0)),
            seconds_since_last_contact: record
                .has_contact()
                .then(|| (now - record.last_contact_with_gate).max(0.0)),
            history: record
                .command_history
                .iter()
                .rev()
                .map(|e| StatusHistoryEntry {
                    timestamp: e.timestamp,
                    target_state: e.target_state,
                    actor: e.actor,
                })
                .collect(),
        }
    }
}

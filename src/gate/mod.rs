//! Gate target-state machine: pure transition logic, no I/O.
//!
//! ```text
//!            ┌──────────── operator ────────────┐
//!            ▼                                  │
//!        CLOSED ──[operator]──▶ OPEN_TEMPORARY ─┤
//!          ▲  │                    │            │
//!          │  └──[operator]──▶ OPEN_PERMANENT ◀─┘
//!          │                       │
//!          ├──────[operator]───────┘
//!          └──[timeout: now ≥ start + open_temporary_seconds]── OPEN_TEMPORARY
//! ```
//!
//! Any state may move to any other by explicit operator command.  Only
//! `OpenTemporary → Closed` fires autonomously, via [`GateMachine::evaluate_timeout`].
//! There is no terminal state.

pub mod record;

use core::fmt;
use core::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::GateError;

pub use record::{Actor, CommandHistory, HISTORY_CAPACITY, HistoryEntry, StateRecord};

/// Seconds since the Unix epoch.
pub type Timestamp = f64;

// ---------------------------------------------------------------------------
// Target state
// ---------------------------------------------------------------------------

/// The server's declared intent for the gate.  `Closed` is the safe default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    #[default]
    Closed,
    OpenTemporary,
    OpenPermanent,
}

impl TargetState {
    pub const ALL: [Self; 3] = [Self::Closed, Self::OpenTemporary, Self::OpenPermanent];

    /// Persisted / wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::OpenTemporary => "open_temporary",
            Self::OpenPermanent => "open_permanent",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetState {
    type Err = GateError;

    /// Rejects anything outside the closed set with [`GateError::InvalidState`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GateError::InvalidState(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Actuation command
// ---------------------------------------------------------------------------

/// The two-valued signal the agent receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationCommand {
    Open,
    Closed,
}

impl ActuationCommand {
    /// The wire token: exactly `"open"` or `"closed"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Parse a wire token.  Only the two exact literals are recognised.
    pub fn from_token(token: &str) -> Result<Self, GateError> {
        match token {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(GateError::Protocol(other.to_owned())),
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ActuationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map target state to the command the agent should actuate.
pub fn compute_command(target: TargetState) -> ActuationCommand {
    match target {
        TargetState::OpenTemporary | TargetState::OpenPermanent => ActuationCommand::Open,
        TargetState::Closed => ActuationCommand::Closed,
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Outcome of a transition, for events and logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: TargetState,
    pub to: TargetState,
    pub at: Timestamp,
    pub actor: Actor,
}

/// Transition policy: the auto-reversion window and history bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateMachine {
    open_temporary_seconds: f64,
    history_max_len: usize,
}

impl Default for GateMachine {
    fn default() -> Self {
        Self::new(10.0, HISTORY_CAPACITY)
    }
}

impl GateMachine {
    pub fn new(open_temporary_seconds: f64, history_max_len: usize) -> Self {
        Self {
            open_temporary_seconds,
            history_max_len: history_max_len.clamp(1, HISTORY_CAPACITY),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            f64::from(config.open_temporary_seconds),
            config.command_history_max_length,
        )
    }

    pub fn open_temporary_seconds(&self) -> f64 {
        self.open_temporary_seconds
    }

    pub fn history_max_len(&self) -> usize {
        self.history_max_len
    }

    /// Set the target, stamp `open_temporary_start` when entering
    /// `OpenTemporary`, and append a history entry.
    ///
    /// Always records, even when `new_target` equals the current state:
    /// operator actions are idempotent in effect but still audited.
    pub fn request_transition(
        &self,
        record: &mut StateRecord,
        new_target: TargetState,
        now: Timestamp,
        actor: Actor,
    ) -> Transition {
        let from = record.target_state;
        record.target_state = new_target;
        if new_target == TargetState::OpenTemporary {
            record.open_temporary_start = now;
        }
        record.command_history.push_bounded(
            HistoryEntry {
                timestamp: now,
                target_state: new_target,
                actor,
            },
            self.history_max_len,
        );
        Transition {
            from,
            to: new_target,
            at: now,
            actor,
        }
    }

    /// When an `OpenTemporary` record reverts, `None` otherwise.
    pub fn closes_at(&self, record: &StateRecord) -> Option<Timestamp> {
        match record.target_state {
            TargetState::OpenTemporary => {
                Some(record.open_temporary_start + self.open_temporary_seconds)
            }
            TargetState::Closed | TargetState::OpenPermanent => None,
        }
    }

    /// The only autonomous transition: `OpenTemporary → Closed` once the
    /// window has elapsed.  A no-op in every other case, so repeated calls
    /// after expiry change nothing further.
    pub fn evaluate_timeout(&self, record: &mut StateRecord, now: Timestamp) -> Option<Transition> {
        let deadline = self.closes_at(record)?;
        if now >= deadline {
            info!("open_temporary: time is up, closing");
            Some(self.request_transition(record, TargetState::Closed, now, Actor::Timeout))
        } else {
            debug!("open_temporary: {:.1}s until closing", deadline - now);
            None
        }
    }
}

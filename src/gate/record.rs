//! The persisted state record and its bounded command history.
//!
//! `StateRecord` is the whole of the server's durable state: one instance,
//! created with defaults on first read, mutated only by read-modify-write
//! cycles in [`GateService`](crate::app::service::GateService).

use serde::{Deserialize, Serialize, Serializer};

use super::{TargetState, Timestamp};

/// Upper bound on retained history entries (fixed-capacity storage).
/// The configured `COMMAND_HISTORY_MAX_LENGTH` may be lower, never higher.
pub const HISTORY_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// History entries
// ---------------------------------------------------------------------------

/// Who requested a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// An operator action through the HTTP surface.
    #[default]
    Operator,
    /// The control loop's auto-reversion.
    Timeout,
}

/// One audit entry.  Immutable once appended; never used for control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub target_state: TargetState,
    /// Absent in records written before actors were tracked.
    #[serde(default)]
    pub actor: Actor,
}

// ---------------------------------------------------------------------------
// CommandHistory
// ---------------------------------------------------------------------------

/// Append-ordered history, oldest first, never longer than [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandHistory {
    entries: heapless::Vec<HistoryEntry, HISTORY_CAPACITY>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from oldest-first entries, keeping only the newest
    /// `max_len` (and never more than [`HISTORY_CAPACITY`]).
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>, max_len: usize) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.push_bounded(entry, max_len);
        }
        history
    }

    /// Append `entry`, evicting the oldest entries so that the length never
    /// exceeds `max_len`.
    pub fn push_bounded(&mut self, entry: HistoryEntry, max_len: usize) {
        let limit = max_len.clamp(1, HISTORY_CAPACITY);
        while self.entries.len() >= limit {
            self.entries.remove(0);
        }
        if self.entries.push(entry).is_err() {
            log::warn!("command history full, dropping entry at {}", entry.timestamp);
        }
    }

    /// Drop the oldest entries until at most `max_len` remain.  Returns
    /// how many were dropped.
    pub fn retain_newest(&mut self, max_len: usize) -> usize {
        let limit = max_len.clamp(1, HISTORY_CAPACITY);
        let excess = self.entries.len().saturating_sub(limit);
        for _ in 0..excess {
            self.entries.remove(0);
        }
        excess
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-first iteration (append order).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The most recently appended entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

impl Serialize for CommandHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

// ---------------------------------------------------------------------------
// StateRecord
// ---------------------------------------------------------------------------

/// The single server-owned record.
///
/// Decoding is not derived: [`crate::store`] merges stored fields over
/// [`StateRecord::default`] one field at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRecord {
    pub target_state: TargetState,
    /// Set when entering `OpenTemporary`; meaningless in other states.
    pub open_temporary_start: Timestamp,
    /// Last successful poll from the agent; 0 until first contact.
    pub last_contact_with_gate: Timestamp,
    pub command_history: CommandHistory,
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            target_state: TargetState::Closed,
            open_temporary_start: 0.0,
            last_contact_with_gate: 0.0,
            command_history: CommandHistory::new(),
        }
    }
}

impl StateRecord {
    /// True once the agent has polled at least once.
    pub fn has_contact(&self) -> bool {
        self.last_contact_with_gate > 0.0
    }
}

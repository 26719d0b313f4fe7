//! Durable persistence of the single [`StateRecord`].
//!
//! The record lives under one well-known key as a JSON object.  Writes
//! always carry the full serialized record in one [`StoragePort::write`],
//! so a crash loses at most the in-flight mutation.
//!
//! ## Merge-on-read
//!
//! A stored object is merged over [`StateRecord::default`] field by field:
//!
//! - missing or `null` fields take their default;
//! - a field whose value cannot be decoded (e.g. an unknown `target_state`)
//!   takes its default and is logged, so unknown values never propagate;
//! - unknown keys are ignored and disappear on the next save;
//! - history entries that fail to decode are skipped individually, and an
//!   over-long history keeps only its newest entries.
//!
//! A value that is not a JSON object at all is discarded in favour of the
//! defaults, which puts the gate in the safe `Closed` state.

use core::fmt;

use log::{error, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::app::ports::{StorageError, StoragePort};
use crate::gate::{CommandHistory, HISTORY_CAPACITY, HistoryEntry, StateRecord};

pub const STATE_NAMESPACE: &str = "gate";
pub const STATE_KEY: &str = "state";

// ───────────────────────────────────────────────────────────────
// StateStore
// ───────────────────────────────────────────────────────────────

pub struct StateStore {
    storage: Box<dyn StoragePort + Send>,
}

impl StateStore {
    pub fn new(storage: Box<dyn StoragePort + Send>) -> Self {
        Self { storage }
    }

    /// Load the record, merging whatever is stored over the defaults.
    ///
    /// Only fails when the storage backend itself fails; an absent key
    /// yields [`StateRecord::default`].
    pub fn load(&self) -> Result<StateRecord, StoreError> {
        match self.storage.read(STATE_NAMESPACE, STATE_KEY)? {
            Some(bytes) => Ok(decode_record(&bytes)),
            None => {
                info!("StateStore: no stored record, using defaults");
                Ok(StateRecord::default())
            }
        }
    }

    /// Persist the full record in a single atomic write.
    pub fn save(&mut self, record: &StateRecord) -> Result<(), StoreError> {
        let bytes = encode_record(record)?;
        self.storage.write(STATE_NAMESPACE, STATE_KEY, &bytes)?;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Encoding
// ───────────────────────────────────────────────────────────────

/// Serialize the record.  Field order is fixed by the struct, so encoding
/// the same record twice yields identical bytes.
pub fn encode_record(record: &StateRecord) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Decode stored bytes with merge-on-read semantics.  Never fails.
pub fn decode_record(bytes: &[u8]) -> StateRecord {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(fields)) => merge_over_defaults(&fields),
        Ok(other) => {
            error!(
                "StateStore: stored record is a JSON {}, not an object; falling back to defaults",
                json_kind(&other)
            );
            StateRecord::default()
        }
        Err(e) => {
            error!("StateStore: stored record is unreadable ({e}); falling back to defaults");
            StateRecord::default()
        }
    }
}

fn merge_over_defaults(fields: &Map<String, Value>) -> StateRecord {
    let defaults = StateRecord::default();
    for key in fields.keys() {
        if !matches!(
            key.as_str(),
            "target_state" | "open_temporary_start" | "last_contact_with_gate" | "command_history"
        ) {
            warn!("StateStore: ignoring unknown field {key:?}");
        }
    }
    StateRecord {
        target_state: field(fields, "target_state").unwrap_or(defaults.target_state),
        open_temporary_start: field(fields, "open_temporary_start")
            .unwrap_or(defaults.open_temporary_start),
        last_contact_with_gate: field(fields, "last_contact_with_gate")
            .unwrap_or(defaults.last_contact_with_gate),
        command_history: history_field(fields).unwrap_or(defaults.command_history),
    }
}

/// Decode one field.  `None` (use the default) when absent, null or invalid.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("StateStore: field {key:?} has invalid value {value} ({e}); using default");
                None
            }
        },
    }
}

fn history_field(fields: &Map<String, Value>) -> Option<CommandHistory> {
    let entries: Vec<Value> = field(fields, "command_history")?;
    let mut skipped = 0usize;
    let decoded = entries.iter().filter_map(|raw| match HistoryEntry::deserialize(raw) {
        Ok(entry) => Some(entry),
        Err(_) => {
            skipped += 1;
            None
        }
    });
    let history = CommandHistory::from_entries(decoded.collect::<Vec<_>>(), HISTORY_CAPACITY);
    if skipped > 0 {
        warn!("StateStore: skipped {skipped} undecodable history entries");
    }
    Some(history)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The storage backend failed.
    Storage(StorageError),
    /// The record could not be serialized.
    Encode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "{e}"),
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

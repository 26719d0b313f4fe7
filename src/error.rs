//! Unified error type for the gate server and agent.
//!
//! Every fallible operation funnels into [`GateError`] so the HTTP layer,
//! the control loop and the agent reconciler handle failures uniformly.
//! Layer-specific errors ([`StorageError`], [`StoreError`],
//! [`TransportError`], [`ConfigError`]) convert into it with `?`.

use core::fmt;

use crate::app::ports::{StorageError, TransportError};
use crate::config::ConfigError;
use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GateError {
    /// A target-state value outside the closed set was encountered.
    /// Indicates a defect or a foreign writer; fatal to the operation only.
    InvalidState(String),
    /// The state record could not be loaded or persisted.
    Store(StoreError),
    /// The outbound poll failed (network, timeout, HTTP status).
    Transport(TransportError),
    /// The server answered with something other than `open` / `closed`.
    Protocol(String),
    /// Driving the relay output pin failed.
    Relay(String),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl GateError {
    /// Short category tag used in log lines.  The agent's reaction to every
    /// category is identical (cooldown, retry); the tag keeps them apart.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "invalid-state",
            Self::Store(_) => "persistence",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Relay(_) => "relay",
            Self::Config(_) => "config",
        }
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState(v) => write!(f, "invalid target state: {v:?}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Protocol(body) => write!(f, "unrecognised command: {body:?}"),
            Self::Relay(msg) => write!(f, "relay: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for GateError {}

impl From<StoreError> for GateError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<StorageError> for GateError {
    fn from(e: StorageError) -> Self {
        Self::Store(StoreError::Storage(e))
    }
}

impl From<TransportError> for GateError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ConfigError> for GateError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, GateError>;

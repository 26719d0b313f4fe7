//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GateService / Reconciler (domain)
//! ```
//!
//! Driven adapters (storage, clock, event sinks, HTTP transport, operator
//! gate) implement these traits.  The domain core never touches the
//! filesystem, the wall clock or the network directly.  The relay output
//! port is `embedded_hal::digital::OutputPin` and is not redefined here.

use core::fmt;

use crate::gate::Timestamp;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ disk)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the state record.
///
/// - Keys are namespaced to keep unrelated records apart.
/// - `write` MUST be atomic: after a crash a reader sees either the
///   previous value or the new one, never a torn mix.
pub trait StoragePort {
    /// Read a value.  `Ok(None)` when the key has never been written.
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The service emits structured [`GateEvent`](super::events::GateEvent)s
/// through this port once the change they describe has been persisted.
pub trait EventSink: Send {
    fn emit(&mut self, event: &super::events::GateEvent);
}

// ───────────────────────────────────────────────────────────────
// Operator gate (external authorization collaborator)
// ───────────────────────────────────────────────────────────────

/// Allows or denies an operator state-change request.
///
/// Session and password mechanics live outside this crate; the service
/// only needs a yes/no answer for the credential presented.
pub trait OperatorGate: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Command transport (agent side: device → server)
// ───────────────────────────────────────────────────────────────

/// One bounded poll of the Command API.
///
/// Returns the raw response body; interpreting it is the reconciler's job
/// so an unexpected payload surfaces as a protocol error, not a transport one.
pub trait CommandTransport {
    fn take_command(&mut self, host: &str) -> Result<String, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying I/O failure.
    Io(std::io::ErrorKind),
    /// Backend is not available (e.g. a lock could not be taken).
    Unavailable,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Unavailable => write!(f, "storage unavailable"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

/// Errors from [`CommandTransport`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// Connection could not be established.
    Connect(String),
    /// The server answered with a non-success HTTP status.
    Status(u16),
    /// The response body could not be read.
    Body(String),
    /// Any other request failure.
    Request(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::Status(code) => write!(f, "server returned HTTP {code}"),
            Self::Body(msg) => write!(f, "unreadable response body: {msg}"),
            Self::Request(msg) => write!(f, "request failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

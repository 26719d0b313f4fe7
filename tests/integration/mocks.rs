//! Mock adapters for integration tests.
//!
//! Every mock is `Clone` and shares its state through an `Arc`, so a test
//! keeps one handle for assertions while the code under test owns another.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use gatelink::app::events::GateEvent;
use gatelink::app::ports::{
    Clock, CommandTransport, EventSink, StorageError, StoragePort, TransportError,
};
use gatelink::app::service::GateService;
use gatelink::gate::{GateMachine, StateRecord, Timestamp};
use gatelink::store::{STATE_KEY, STATE_NAMESPACE, StateStore, decode_record};

// ── MockStorage ───────────────────────────────────────────────

#[derive(Default)]
struct StorageState {
    entries: HashMap<(String, String), Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

#[derive(Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<StorageState>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .entries
            .get(&(STATE_NAMESPACE.to_owned(), STATE_KEY.to_owned()))
            .cloned()
    }

    pub fn put_raw(&self, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert((STATE_NAMESPACE.to_owned(), STATE_KEY.to_owned()), bytes.to_vec());
    }

    /// The record as a fresh process would see it.
    pub fn persisted(&self) -> StateRecord {
        self.raw().map(|b| decode_record(&b)).unwrap_or_default()
    }
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(StorageError::Io(std::io::ErrorKind::Other));
        }
        Ok(state
            .entries
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(StorageError::Unavailable);
        }
        state
            .entries
            .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        state.writes += 1;
        Ok(())
    }
}

// ── ManualClock ───────────────────────────────────────────────

pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(t: Timestamp) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(t.to_bits())))
    }

    pub fn set(&self, t: Timestamp) {
        self.0.store(t.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<GateEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GateEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub service: Arc<GateService>,
    pub storage: MockStorage,
    pub clock: Arc<ManualClock>,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new(machine: GateMachine, t0: Timestamp) -> Self {
        let storage = MockStorage::new();
        let clock = ManualClock::at(t0);
        let sink = RecordingSink::default();
        let service = Arc::new(GateService::new(
            machine,
            StateStore::new(Box::new(storage.clone())),
            clock.clone(),
            Box::new(sink.clone()),
        ));
        Self {
            service,
            storage,
            clock,
            sink,
        }
    }

    /// Ten-second window, full history, starting at `t0`.
    pub fn at(t0: Timestamp) -> Self {
        Self::new(GateMachine::new(10.0, 100), t0)
    }

    /// A second service over the same storage, as after a process restart.
    pub fn restart(&self) -> GateService {
        GateService::new(
            *self.service.machine(),
            StateStore::new(Box::new(self.storage.clone())),
            self.clock.clone(),
            Box::new(RecordingSink::default()),
        )
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Records every level driven; `true` = high (energized).
#[derive(Clone, Default)]
pub struct MockPin {
    levels: Arc<Mutex<Vec<bool>>>,
    fail: Arc<AtomicBool>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().unwrap().clone()
    }

    pub fn is_energized(&self) -> bool {
        self.levels().last().copied().unwrap_or(false)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn drive(&mut self, high: bool) -> Result<(), MockPinError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MockPinError);
        }
        self.levels.lock().unwrap().push(high);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

// ── ScriptedTransport ─────────────────────────────────────────

/// Replays scripted replies.  Once the script runs out it answers
/// `Timeout` and raises `stop` (when given) so `Reconciler::run` returns.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Result<String, TransportError>>>>,
    calls: Arc<AtomicUsize>,
    hosts: Arc<Mutex<Vec<String>>>,
    stop: Option<Arc<AtomicBool>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Result<String, TransportError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Self::new(tokens.iter().map(|t| Ok((*t).to_owned())))
    }

    pub fn stopping(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

impl CommandTransport for ScriptedTransport {
    fn take_command(&mut self, host: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts.lock().unwrap().push(host.to_owned());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => {
                if let Some(stop) = &self.stop {
                    stop.store(true, Ordering::SeqCst);
                }
                Err(TransportError::Timeout)
            }
        }
    }
}

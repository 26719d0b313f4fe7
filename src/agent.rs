//! Agent reconciler.
//!
//! A single sequential loop that pulls the commanded output from the
//! server and drives the relay to match:
//!
//! ```text
//!   ┌─▶ take_command(host) ──▶ parse token ──▶ relay.apply ──▶ sleep(poll) ─┐
//!   │          │ err               │ err            │ err                    │
//!   │          └───────────────────┴────────────────┴──▶ log, sleep(backoff) ┤
//!   └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is transient: it is logged with its category and the loop
//! keeps going after a fixed backoff.  A payload that is not exactly
//! `open` or `closed` never reaches the relay.  Shutdown is cooperative
//! through an `AtomicBool`; waits are sliced so the flag is seen quickly,
//! and the outbound request is bounded by the transport's own timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::OutputPin;
use log::{debug, error, info};

use crate::app::ports::CommandTransport;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::gate::ActuationCommand;
use crate::safety::FailSafeRelay;

const WAKE_SLICE: Duration = Duration::from_millis(50);

/// Loop pacing.  Fixed delays, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl Cadence {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

pub struct Reconciler<T: CommandTransport, P: OutputPin> {
    transport: T,
    relay: FailSafeRelay<P>,
    host: String,
    cadence: Cadence,
}

impl<T: CommandTransport, P: OutputPin> Reconciler<T, P> {
    /// Takes ownership of the pin and drives it closed immediately.
    pub fn new(transport: T, pin: P, host: impl Into<String>, cadence: Cadence) -> Result<Self> {
        Ok(Self {
            transport,
            relay: FailSafeRelay::new(pin)?,
            host: host.into(),
            cadence,
        })
    }

    /// One poll-and-apply round.
    pub fn step(&mut self) -> Result<ActuationCommand> {
        let body = self.transport.take_command(&self.host)?;
        let command = ActuationCommand::from_token(&body)?;
        if !self.relay.apply(command)? {
            debug!("Reconciler: relay already {command}");
        }
        Ok(command)
    }

    /// Poll until `shutdown` is set.  Never returns early on errors.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "Reconciler: polling as {:?} every {:?} (backoff {:?})",
            self.host, self.cadence.poll_interval, self.cadence.retry_backoff
        );
        while !shutdown.load(Ordering::SeqCst) {
            let pause = match self.step() {
                Ok(_) => self.cadence.poll_interval,
                Err(e) => {
                    error!(
                        "Reconciler: poll failed [{}]: {e}; retrying in {:?}",
                        e.category(),
                        self.cadence.retry_backoff
                    );
                    self.cadence.retry_backoff
                }
            };
            wait(pause, shutdown);
        }
        info!("Reconciler: shutdown requested");
    }

    pub fn relay(&self) -> &FailSafeRelay<P> {
        &self.relay
    }

    /// Drive the relay closed and hand back the pin.
    pub fn release(self) -> Result<P> {
        self.relay.release()
    }
}

/// Sleep for `total`, waking early once `shutdown` is set.
fn wait(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !shutdown.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return;
        }
        thread::sleep(left.min(WAKE_SLICE));
    }
}

//! Fail-safe relay guard.
//!
//! [`FailSafeRelay`] owns the relay pin for its whole lifetime and makes
//! "closed" the state the hardware falls back to:
//!
//! 1. Construction drives the relay closed before any command is known.
//! 2. [`apply`](FailSafeRelay::apply) touches the pin only when the
//!    commanded output changes.
//! 3. [`release`](FailSafeRelay::release) and `Drop` drive it closed
//!    again, so an early return, a panic unwinding through the agent or
//!    a shutdown signal all leave the gate closed.
//!
//! Logical high on the pin means "coil energized", which opens the gate.

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::error::{GateError, Result};
use crate::gate::ActuationCommand;

pub struct FailSafeRelay<P: OutputPin> {
    pin: Option<P>,
    /// Last level successfully driven.  `None` when unknown.
    output: Option<ActuationCommand>,
}

impl<P: OutputPin> FailSafeRelay<P> {
    pub fn new(pin: P) -> Result<Self> {
        let mut relay = Self {
            pin: Some(pin),
            output: None,
        };
        relay.drive(ActuationCommand::Closed)?;
        Ok(relay)
    }

    /// Drive the relay to `command`.  Returns `true` when the pin changed.
    pub fn apply(&mut self, command: ActuationCommand) -> Result<bool> {
        if self.output == Some(command) {
            return Ok(false);
        }
        self.drive(command)?;
        info!("relay -> {command}");
        Ok(true)
    }

    pub fn output(&self) -> Option<ActuationCommand> {
        self.output
    }

    /// Drive closed and hand the pin back.
    pub fn release(mut self) -> Result<P> {
        self.drive(ActuationCommand::Closed)?;
        self.pin
            .take()
            .ok_or_else(|| GateError::Relay("pin already released".into()))
    }

    fn drive(&mut self, command: ActuationCommand) -> Result<()> {
        let pin = self
            .pin
            .as_mut()
            .ok_or_else(|| GateError::Relay("pin already released".into()))?;
        let driven = if command.is_open() {
            pin.set_high()
        } else {
            pin.set_low()
        };
        match driven {
            Ok(()) => {
                self.output = Some(command);
                Ok(())
            }
            Err(e) => {
                self.output = None;
                Err(GateError::Relay(format!("driving {command} failed: {e:?}")))
            }
        }
    }
}

impl<P: OutputPin> Drop for FailSafeRelay<P> {
    fn drop(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            match pin.set_low() {
                Ok(()) => warn!("relay guard dropped; relay driven closed"),
                Err(e) => error!("relay guard dropped; FAILED to drive closed: {e:?}"),
            }
        }
    }
}

//! Relay coil drivers.
//!
//! Both drivers implement `embedded_hal::digital::OutputPin`, where a
//! logical *high* means "coil energized" (gate open).  Polarity of the
//! physical line is handled here, so callers never see `active_low`.
//!
//! ## Targets
//!
//! - [`SysfsRelayPin`]: Linux GPIO through `/sys/class/gpio`.
//! - [`SimulatedRelayPin`]: in-memory level, logged on every change.
//!   Used when no GPIO line is configured.

use core::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use log::{debug, info};

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinError(pub String);

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay pin: {}", self.0)
    }
}

impl std::error::Error for PinError {}

impl digital::Error for PinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl From<std::io::Error> for PinError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

// ── Sysfs ─────────────────────────────────────────────────────

pub struct SysfsRelayPin {
    value_path: PathBuf,
    active_low: bool,
}

impl SysfsRelayPin {
    /// Export `gpio`, configure it as an output and drive it de-energized.
    pub fn export(gpio: u32, active_low: bool) -> Result<Self, PinError> {
        Self::export_under(Path::new(SYSFS_GPIO_ROOT), gpio, active_low)
    }

    /// Same as [`export`](Self::export) against an arbitrary sysfs root.
    pub fn export_under(root: &Path, gpio: u32, active_low: bool) -> Result<Self, PinError> {
        let dir = root.join(format!("gpio{gpio}"));
        if !dir.is_dir() {
            fs::write(root.join("export"), gpio.to_string())?;
        }
        fs::write(dir.join("direction"), "out")?;

        let mut pin = Self {
            value_path: dir.join("value"),
            active_low,
        };
        pin.drive(false)?;
        info!(
            "SysfsRelayPin: gpio{gpio} ready ({})",
            if active_low { "active-low" } else { "active-high" }
        );
        Ok(pin)
    }

    fn drive(&mut self, energized: bool) -> Result<(), PinError> {
        let line_high = energized != self.active_low;
        fs::write(&self.value_path, if line_high { "1" } else { "0" })?;
        debug!("SysfsRelayPin: energized={energized}");
        Ok(())
    }
}

impl ErrorType for SysfsRelayPin {
    type Error = PinError;
}

impl OutputPin for SysfsRelayPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

// ── Simulated ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimulatedRelayPin {
    energized: bool,
}

impl SimulatedRelayPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }

    fn drive(&mut self, energized: bool) {
        if self.energized != energized {
            info!(
                "SimulatedRelayPin: relay {}",
                if energized { "ENERGIZED (open)" } else { "released (closed)" }
            );
        }
        self.energized = energized;
    }
}

impl ErrorType for SimulatedRelayPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimulatedRelayPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

//! Runtime configuration for the server and the agent.
//!
//! Defaults live in the `Default` impls.  Every field can be overridden
//! from the environment; overrides are range-checked by `validate()` and
//! rejected rather than clamped.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gate::HISTORY_CAPACITY;

// ───────────────────────────────────────────────────────────────
// Server configuration
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    // --- State machine ---
    /// Auto-reversion window for `open_temporary` (seconds).
    pub open_temporary_seconds: u32,
    /// Retained command history entries.
    pub command_history_max_length: usize,

    // --- Timing ---
    /// Control loop tick period (milliseconds).
    pub control_interval_ms: u64,

    // --- Deployment ---
    /// Directory holding the persisted state record.
    pub data_dir: PathBuf,
    /// Socket address the HTTP surface binds to.
    pub listen_addr: String,
    /// Shared key required for operator actions.  `None` disables the check.
    #[serde(skip)]
    pub operator_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            open_temporary_seconds: 10,
            command_history_max_length: HISTORY_CAPACITY,
            control_interval_ms: 1000, // 1 Hz
            data_dir: PathBuf::from("data"),
            listen_addr: "0.0.0.0:8080".to_owned(),
            operator_key: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, then validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, "OPEN_TEMPORARY_SECONDS")? {
            cfg.open_temporary_seconds = v;
        }
        if let Some(v) = parse_var(&lookup, "COMMAND_HISTORY_MAX_LENGTH")? {
            cfg.command_history_max_length = v;
        }
        if let Some(v) = parse_var(&lookup, "GATE_CONTROL_INTERVAL_MS")? {
            cfg.control_interval_ms = v;
        }
        if let Some(v) = lookup("GATE_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GATE_LISTEN_ADDR") {
            cfg.listen_addr = v;
        }
        cfg.operator_key = lookup("GATE_OPERATOR_KEY").filter(|k| !k.is_empty());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3600).contains(&self.open_temporary_seconds) {
            return Err(ConfigError::ValidationFailed(
                "OPEN_TEMPORARY_SECONDS must be 1–3600",
            ));
        }
        if !(1..=HISTORY_CAPACITY).contains(&self.command_history_max_length) {
            return Err(ConfigError::ValidationFailed(
                "COMMAND_HISTORY_MAX_LENGTH must be 1–100",
            ));
        }
        if !(100..=60_000).contains(&self.control_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "GATE_CONTROL_INTERVAL_MS must be 100–60000",
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed("GATE_DATA_DIR must not be empty"));
        }
        Ok(())
    }

    pub fn control_interval(&self) -> Duration {
        Duration::from_millis(self.control_interval_ms)
    }
}

// ───────────────────────────────────────────────────────────────
// Agent configuration
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    // --- Server ---
    /// Base URL of the gate server.
    pub server_url: String,
    /// Identity sent as `{host}` in every poll.
    pub host: String,

    // --- Timing ---
    /// Sleep between successful polls (milliseconds).
    pub poll_interval_ms: u64,
    /// Watchdog on every outbound request (milliseconds).
    pub request_timeout_ms: u64,
    /// Cooldown after any failure (milliseconds).
    pub retry_backoff_ms: u64,

    // --- Relay ---
    /// Linux sysfs GPIO number driving the relay.  `None` = simulated relay.
    pub relay_gpio: Option<u32>,
    /// Relay board energises on a low level.
    pub relay_active_low: bool,

    // --- Liveness ---
    /// External heartbeat endpoint.  `None` disables the reporter.
    pub heartbeat_url: Option<String>,
    pub heartbeat_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_owned(),
            host: "gate-agent".to_owned(),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            retry_backoff_ms: 2000,
            relay_gpio: None,
            relay_active_low: false,
            heartbeat_url: None,
            heartbeat_interval_secs: 60,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("GATE_SERVER_URL") {
            cfg.server_url = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = lookup("GATE_AGENT_HOST").or_else(|| lookup("HOSTNAME")) {
            cfg.host = v;
        }
        if let Some(v) = parse_var(&lookup, "GATE_POLL_INTERVAL_MS")? {
            cfg.poll_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "GATE_REQUEST_TIMEOUT_MS")? {
            cfg.request_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "GATE_RETRY_BACKOFF_MS")? {
            cfg.retry_backoff_ms = v;
        }
        cfg.relay_gpio = parse_var(&lookup, "GATE_RELAY_GPIO")?;
        if let Some(v) = parse_var(&lookup, "GATE_RELAY_ACTIVE_LOW")? {
            cfg.relay_active_low = v;
        }
        cfg.heartbeat_url = lookup("GATE_HEARTBEAT_URL").filter(|u| !u.is_empty());
        if let Some(v) = parse_var(&lookup, "GATE_HEARTBEAT_INTERVAL_SECS")? {
            cfg.heartbeat_interval_secs = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(
                "GATE_SERVER_URL must start with http:// or https://",
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::ValidationFailed("GATE_AGENT_HOST must not be empty"));
        }
        if !(100..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "GATE_POLL_INTERVAL_MS must be 100–60000",
            ));
        }
        if !(100..=60_000).contains(&self.request_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "GATE_REQUEST_TIMEOUT_MS must be 100–60000",
            ));
        }
        if !(100..=60_000).contains(&self.retry_backoff_ms) {
            return Err(ConfigError::ValidationFailed(
                "GATE_RETRY_BACKOFF_MS must be 100–60000",
            ));
        }
        if !(5..=3600).contains(&self.heartbeat_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "GATE_HEARTBEAT_INTERVAL_SECS must be 5–3600",
            ));
        }
        Ok(())
    }

    /// Full URL of the Command API endpoint.
    pub fn command_url(&self) -> String {
        format!("{}/api/take_command", self.server_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment value could not be parsed into the field's type.
    Unparseable { key: &'static str, value: String },
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable { key, value } => write!(f, "cannot parse {key}={value:?}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Unparseable { key, value: raw }),
    }
}

//! gate-agent: polls the gate server and mirrors its command onto the relay.
//!
//! Runs on the device next to the relay.  No inbound connectivity is
//! needed; every exchange is an outbound POST bounded by a timeout.  On
//! SIGINT/SIGTERM, on error and on panic unwind the relay ends closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use embedded_hal::digital::OutputPin;
use log::{info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing_subscriber::EnvFilter;

use gatelink::adapters::heartbeat::Heartbeat;
use gatelink::adapters::http_client::HttpTransport;
use gatelink::agent::{Cadence, Reconciler};
use gatelink::config::AgentConfig;
use gatelink::drivers::relay::{SimulatedRelayPin, SysfsRelayPin};

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("gate-agent v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = AgentConfig::from_env().context("invalid agent configuration")?;
    info!(
        "config: server={} host={} poll={}ms timeout={}ms backoff={}ms",
        config.server_url,
        config.host,
        config.poll_interval_ms,
        config.request_timeout_ms,
        config.retry_backoff_ms
    );

    // ── 3. Shutdown flag ──────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .with_context(|| format!("cannot register handler for signal {signal}"))?;
    }

    // ── 4. Heartbeat (optional, independent of control) ───────
    let heartbeat = match config.heartbeat_url.clone() {
        Some(url) => match Heartbeat::spawn(
            url,
            config.heartbeat_interval(),
            config.request_timeout(),
            Arc::clone(&shutdown),
        ) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("heartbeat disabled: {e}");
                None
            }
        },
        None => None,
    };

    // ── 5. Relay + control loop ───────────────────────────────
    let outcome = match config.relay_gpio {
        Some(gpio) => {
            let pin = SysfsRelayPin::export(gpio, config.relay_active_low)
                .with_context(|| format!("cannot export relay gpio{gpio}"))?;
            reconcile(&config, pin, &shutdown)
        }
        None => {
            warn!("GATE_RELAY_GPIO not set: driving a simulated relay");
            reconcile(&config, SimulatedRelayPin::new(), &shutdown)
        }
    };

    // ── 6. Teardown ───────────────────────────────────────────
    shutdown.store(true, Ordering::SeqCst);
    if let Some(h) = heartbeat {
        h.join();
    }
    outcome?;
    info!("gate-agent stopped; relay closed");
    Ok(())
}

fn reconcile<P: OutputPin>(config: &AgentConfig, pin: P, shutdown: &AtomicBool) -> Result<()> {
    let transport = HttpTransport::new(config.command_url(), config.request_timeout())
        .context("cannot build HTTP client")?;
    let mut reconciler = Reconciler::new(
        transport,
        pin,
        config.host.clone(),
        Cadence::from_config(config),
    )
    .context("cannot drive relay to its safe state")?;

    reconciler.run(shutdown);
    reconciler
        .release()
        .context("failed to drive relay closed on shutdown")?;
    Ok(())
}

//! gate-server: authoritative gate state, Command API and control loop.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                    │
//! │                                                             │
//! │  axum router      FileStorage     SystemClock  LogEventSink │
//! │  (http_api)       (StoragePort)   (Clock)      (EventSink)  │
//! │                                                             │
//! │  ───────────────── Port Trait Boundary ──────────────────   │
//! │                                                             │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │   GateService: lock → load → GateMachine → save       │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │                                                             │
//! │  ControlLoop (tokio task, own start/stop lifecycle)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use gatelink::adapters::file_storage::FileStorage;
use gatelink::adapters::http_api;
use gatelink::adapters::log_sink::LogEventSink;
use gatelink::adapters::operator_gate::{AllowAll, SharedKeyGate};
use gatelink::adapters::time::SystemClock;
use gatelink::app::ports::OperatorGate;
use gatelink::app::service::GateService;
use gatelink::config::ServerConfig;
use gatelink::control_loop::ControlLoop;
use gatelink::gate::GateMachine;
use gatelink::store::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("gate-server v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = ServerConfig::from_env().context("invalid server configuration")?;
    info!(
        "config: open_temporary={}s history_max={} tick={}ms data_dir={}",
        config.open_temporary_seconds,
        config.command_history_max_length,
        config.control_interval_ms,
        config.data_dir.display()
    );

    // ── 3. Core ───────────────────────────────────────────────
    let storage = FileStorage::open(&config.data_dir)
        .with_context(|| format!("cannot open data dir {}", config.data_dir.display()))?;
    let service = Arc::new(GateService::new(
        GateMachine::from_config(&config),
        StateStore::new(Box::new(storage)),
        Arc::new(SystemClock),
        Box::new(LogEventSink::new()),
    ));
    let boot = service.status().context("cannot read stored gate state")?;
    info!("restored state: {} (command {})", boot.target_state, boot.command);

    let gate: Arc<dyn OperatorGate> = match config.operator_key.as_deref() {
        Some(key) => Arc::new(SharedKeyGate::new(key)),
        None => {
            warn!("GATE_OPERATOR_KEY not set: operator routes are open to anyone");
            Arc::new(AllowAll)
        }
    };

    // ── 4. Control loop ───────────────────────────────────────
    let control = ControlLoop::start(Arc::clone(&service), config.control_interval());

    // ── 5. HTTP ───────────────────────────────────────────────
    let app = http_api::router(service, gate).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;
    info!("listening on {}", config.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // ── 6. Teardown ───────────────────────────────────────────
    control.stop().await;
    served.context("HTTP server failed")?;
    info!("gate-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

//! Periodic auto-reversion driver.
//!
//! A tokio task calls [`GateService::control_tick`] once per period.  A
//! failed tick is logged and dropped; the next tick re-reads the store and
//! retries from scratch, so a transient storage fault delays the
//! auto-close by at most one period after recovery.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::app::service::GateService;

pub struct ControlLoop {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ControlLoop {
    /// Spawn the loop on the current tokio runtime.  The first tick runs
    /// immediately.
    pub fn start(service: Arc<GateService>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("ControlLoop: started (period {period:?})");

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => tick(&service).await,
                }
            }
            info!("ControlLoop: stopped");
        });

        Self { stop, handle }
    }

    /// Signal the loop to exit and wait for it.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!("ControlLoop: task ended abnormally: {e}");
        }
    }
}

/// The tick does file I/O under the service mutex, so it runs on the
/// blocking pool.
async fn tick(service: &Arc<GateService>) {
    let service = Arc::clone(service);
    match tokio::task::spawn_blocking(move || service.control_tick()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("ControlLoop: tick failed [{}]: {e}", e.category()),
        Err(e) => error!("ControlLoop: tick did not complete: {e}"),
    }
}

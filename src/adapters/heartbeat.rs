//! Liveness heartbeat.
//!
//! A background thread issues `GET <url>` on a fixed interval so an
//! external monitor can tell the agent is alive.  It shares nothing with
//! the control path: a failing heartbeat is logged and otherwise ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// Granularity at which the thread notices shutdown while waiting.
const WAKE_SLICE: Duration = Duration::from_millis(100);

pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Start the heartbeat thread.  It exits once `shutdown` is set.
    pub fn spawn(
        url: String,
        interval: Duration,
        timeout: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("heartbeat".into())
            .spawn(move || run(&url, interval, timeout, &shutdown))?;
        Ok(Self { handle })
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("Heartbeat: thread panicked");
        }
    }
}

fn run(url: &str, interval: Duration, timeout: Duration, shutdown: &AtomicBool) {
    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            warn!("Heartbeat: cannot build HTTP client ({e}); heartbeat disabled");
            return;
        }
    };
    info!("Heartbeat: pinging {url} every {interval:?}");

    while !shutdown.load(Ordering::Relaxed) {
        match client.get(url).send() {
            Ok(resp) if resp.status().is_success() => debug!("Heartbeat: ok"),
            Ok(resp) => warn!("Heartbeat: HTTP {}", resp.status().as_u16()),
            Err(e) => warn!("Heartbeat: {e}"),
        }

        let deadline = Instant::now() + interval;
        while !shutdown.load(Ordering::Relaxed) {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(WAKE_SLICE));
        }
    }
}

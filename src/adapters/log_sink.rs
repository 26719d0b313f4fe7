//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`GateEvent`] as one
//! structured line through the `log` facade.

use log::{debug, error, info};

use crate::app::events::GateEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`GateEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &GateEvent) {
        match event {
            GateEvent::TransitionRequested(t) => {
                info!("CMD | {} -> {} | at={:.3}", t.from, t.to, t.at);
            }
            GateEvent::AutoClosed { opened_at, closed_at } => {
                info!(
                    "AUTO | open_temporary expired | opened={:.3} closed={:.3} ({:.1}s)",
                    opened_at,
                    closed_at,
                    closed_at - opened_at
                );
            }
            GateEvent::ContactRecorded { host, command } => {
                debug!("CONTACT | host={} | command={}", host, command);
            }
            GateEvent::PersistFailed { operation, error } => {
                error!("STORE | {} aborted: {}", operation, error);
            }
        }
    }
}

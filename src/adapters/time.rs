//! System clock adapter.
//!
//! Wall-clock seconds since the Unix epoch, as the persisted record
//! stores them.  Monotonicity is not guaranteed; a clock step backwards
//! only delays auto-reversion, it never skips it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;
use crate::gate::Timestamp;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}

//! Wall-clock source used to stamp and age messages.

use chrono::{DateTime, Local, TimeDelta};
use tokio::time::Instant;

/// Supplies the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Local time that advances with the tokio clock.
///
/// The wall time is sampled once and then moved forward by the elapsed
/// tokio [`Instant`], so a paused runtime also pauses message ageing.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor_wall: DateTime<Local>,
    anchor: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Local::now(),
            anchor: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        TimeDelta::from_std(self.anchor.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor_wall.checked_add_signed(elapsed))
            .unwrap_or_else(Local::now)
    }
}

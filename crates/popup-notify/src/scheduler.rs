//! Periodic expiry sweep for one popup instance.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::controller::{ControllerInner, PopupInstance};

/// Tick every `period` until the popup empties, closes, or the controller
/// goes away. The first tick fires one full period after start.
pub(crate) async fn run(
    controller: Weak<ControllerInner>,
    instance: Arc<PopupInstance>,
    period: Duration,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = instance.ticks.cancelled() => {
                tracing::debug!(popup = %instance.id, "Expiry timer stopped (closing)");
                return;
            }
            _ = ticks.tick() => {}
        }

        let Some(inner) = controller.upgrade() else {
            tracing::debug!(popup = %instance.id, "Expiry timer stopped (controller dropped)");
            return;
        };
        if !inner.on_tick(&instance) {
            tracing::debug!(popup = %instance.id, "Expiry timer stopped");
            return;
        }
    }
}

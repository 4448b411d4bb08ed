//! Clear, fade and dispose sequence for a closing popup.

use std::sync::{Arc, Weak};

use crate::controller::{ControllerInner, PopupId, PopupInstance};
use crate::dispatcher::{UiDispatcher, invoke_async};
use crate::fade::{self, FadePlan};

/// Releases the controller slot when dropped, so a failed or aborted close
/// never leaves a dead popup blocking new messages.
struct SlotRelease {
    controller: Weak<ControllerInner>,
    popup: PopupId,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if let Some(inner) = self.controller.upgrade() {
            inner.release(self.popup);
        }
    }
}

/// Run the close sequence. The caller has already won `begin_close`.
pub(crate) async fn run(
    controller: Weak<ControllerInner>,
    ui: Arc<dyn UiDispatcher>,
    instance: Arc<PopupInstance>,
    plan: FadePlan,
) {
    let _release = SlotRelease {
        controller,
        popup: instance.id,
    };

    instance.store.clear();
    instance.ticks.cancel();

    let surface = instance.surface.clone();
    if let Err(e) = ui.post(Box::new(move || surface.render(&[]))) {
        tracing::debug!(popup = %instance.id, "Skipped clearing popup rows: {e}");
    }

    fade::run(plan, instance.surface.clone(), ui.as_ref()).await;

    let surface = instance.surface.clone();
    match invoke_async(ui.as_ref(), move || surface.close()).await {
        Ok(Ok(())) => tracing::info!(popup = %instance.id, "Popup disposed"),
        Ok(Err(e)) => tracing::error!(popup = %instance.id, "Popup dispose failed: {e}"),
        Err(e) => tracing::error!(popup = %instance.id, "Popup dispose not run: {e}"),
    }
}

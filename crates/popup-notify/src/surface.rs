//! Display collaborator: the window that renders the message rows.

use std::sync::{Arc, Weak};

use crate::Result;
use crate::controller::{ControllerInner, PopupId};
use crate::geometry::{Point, Size};
use crate::message::Message;

/// A popup window owned by the host toolkit.
///
/// Every method is invoked on the UI thread through the controller's
/// dispatcher.
pub trait PopupSurface: Send + Sync {
    /// Outer size, used for bottom-right placement.
    fn size(&self) -> Size;

    /// Move to `origin` and make the window visible.
    fn show_at(&self, origin: Point);

    /// Replace the displayed rows, oldest first.
    fn render(&self, rows: &[Message]);

    fn opacity(&self) -> f64;

    fn set_opacity(&self, opacity: f64);

    /// Close and dispose the window.
    fn close(&self) -> Result<()>;
}

/// Builds a surface for each new popup instance.
pub trait SurfaceFactory: Send + Sync {
    /// Create (but do not show) a surface. `clicks` must be invoked when
    /// the user clicks the message list.
    fn create(&self, clicks: ClickHandle) -> Result<Arc<dyn PopupSurface>>;
}

/// Forwards clicks on a surface back to its controller.
#[derive(Clone)]
pub struct ClickHandle {
    controller: Weak<ControllerInner>,
    popup: PopupId,
}

impl ClickHandle {
    pub(crate) fn new(controller: Weak<ControllerInner>, popup: PopupId) -> Self {
        Self { controller, popup }
    }

    pub fn popup(&self) -> PopupId {
        self.popup
    }

    /// Dismiss the popup with the click fade, whatever is still pending.
    pub fn click(&self) {
        match self.controller.upgrade() {
            Some(inner) => inner.dismiss(self.popup),
            None => tracing::debug!(popup = %self.popup, "Click after controller dropped"),
        }
    }
}

impl std::fmt::Debug for ClickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHandle").field("popup", &self.popup).finish()
    }
}

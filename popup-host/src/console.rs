//! Terminal stand-in for the popup window.
//!
//! Renders rows to stdout and logs opacity/dispose calls, so the controller
//! can be exercised without a desktop toolkit.

use std::sync::{Arc, Mutex};

use popup_notify::{ClickHandle, Message, Point, PopupSurface, Size, SurfaceFactory};

const POPUP_SIZE: Size = Size {
    width: 360,
    height: 240,
};

pub struct ConsoleSurface {
    clicks: ClickHandle,
    opacity: Mutex<f64>,
}

impl PopupSurface for ConsoleSurface {
    fn size(&self) -> Size {
        POPUP_SIZE
    }

    fn show_at(&self, origin: Point) {
        tracing::info!(popup = %self.clicks.popup(), x = origin.x, y = origin.y, "Popup shown");
    }

    fn render(&self, rows: &[Message]) {
        println!("┌─ {} ({} message(s))", self.clicks.popup(), rows.len());
        for row in rows {
            println!("│ {}  {}", row.created_at().format("%H:%M:%S"), row.text());
        }
        println!("└─");
    }

    fn opacity(&self) -> f64 {
        self.opacity.lock().map(|o| *o).unwrap_or(1.0)
    }

    fn set_opacity(&self, opacity: f64) {
        if let Ok(mut current) = self.opacity.lock() {
            *current = opacity;
        }
        tracing::trace!(popup = %self.clicks.popup(), opacity, "Opacity");
    }

    fn close(&self) -> popup_notify::Result<()> {
        tracing::info!(popup = %self.clicks.popup(), "Popup window closed");
        Ok(())
    }
}

/// Creates console surfaces and remembers the newest one for simulated clicks.
#[derive(Default)]
pub struct ConsoleSurfaceFactory {
    latest: Mutex<Option<ClickHandle>>,
}

impl ConsoleSurfaceFactory {
    /// Click the most recently created popup, if any.
    pub fn click_latest(&self) {
        let handle = self.latest.lock().ok().and_then(|h| h.clone());
        match handle {
            Some(handle) => handle.click(),
            None => tracing::info!("No popup to click"),
        }
    }
}

impl SurfaceFactory for ConsoleSurfaceFactory {
    fn create(&self, clicks: ClickHandle) -> popup_notify::Result<Arc<dyn PopupSurface>> {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(clicks.clone());
        }
        Ok(Arc::new(ConsoleSurface {
            clicks,
            opacity: Mutex::new(1.0),
        }))
    }
}

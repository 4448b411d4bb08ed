//! Opacity fade played before a popup is disposed.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::{UiDispatcher, invoke_async};
use crate::surface::PopupSurface;

/// Fixed-step fade from the current opacity down to zero.
///
/// A full fade (opacity 1.0) takes `steps` frames spaced `duration / steps`
/// apart; a partially faded window takes proportionally fewer frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadePlan {
    steps: u32,
    frame_delay: Duration,
}

impl FadePlan {
    pub fn new(duration: Duration, steps: u32) -> Self {
        let steps = steps.max(1);
        Self {
            steps,
            frame_delay: duration / steps,
        }
    }

    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }

    /// Opacity values to apply, starting below `start` and ending at exactly 0.
    pub fn frames(&self, start: f64) -> impl Iterator<Item = f64> {
        let start = if start.is_finite() { start.clamp(0.0, 1.0) } else { 1.0 };
        let steps = f64::from(self.steps);
        let count = (start * steps).ceil() as u32;
        (1..=count).map(move |i| (start - f64::from(i) / steps).max(0.0))
    }
}

/// Play `plan` on `surface`, posting each opacity to the UI thread.
///
/// A failed opacity read is treated as fully opaque. Failed posts are
/// ignored; the caller disposes the window regardless.
pub(crate) async fn run(plan: FadePlan, surface: Arc<dyn PopupSurface>, ui: &dyn UiDispatcher) {
    let reader = surface.clone();
    let start = invoke_async(ui, move || reader.opacity())
        .await
        .unwrap_or(1.0);

    for opacity in plan.frames(start) {
        let target = surface.clone();
        if let Err(e) = ui.post(Box::new(move || target.set_opacity(opacity))) {
            tracing::debug!("Fade frame dropped: {e}");
        }
        if !plan.frame_delay.is_zero() {
            tokio::time::sleep(plan.frame_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_fade_has_one_frame_per_step() {
        let plan = FadePlan::new(Duration::from_millis(1000), 100);
        let frames: Vec<f64> = plan.frames(1.0).collect();

        assert_eq!(frames.len(), 100);
        assert_eq!(plan.frame_delay(), Duration::from_millis(10));
        assert!((frames[0] - 0.99).abs() < 1e-9);
        assert_eq!(*frames.last().unwrap(), 0.0);
        assert!(frames.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_partial_fade_takes_fewer_frames() {
        let plan = FadePlan::new(Duration::from_millis(1000), 100);
        let frames: Vec<f64> = plan.frames(0.255).collect();
        assert_eq!(frames.len(), 26);
        assert_eq!(*frames.last().unwrap(), 0.0);
    }

    #[test]
    fn test_transparent_window_needs_no_frames() {
        let plan = FadePlan::new(Duration::from_millis(1000), 100);
        assert_eq!(plan.frames(0.0).count(), 0);
    }

    #[test]
    fn test_zero_duration_has_no_delay() {
        let plan = FadePlan::new(Duration::ZERO, 100);
        assert!(plan.frame_delay().is_zero());
        assert_eq!(plan.frames(1.0).count(), 100);
    }

    #[test]
    fn test_out_of_range_start_is_clamped() {
        let plan = FadePlan::new(Duration::from_millis(100), 10);
        assert_eq!(plan.frames(3.0).count(), 10);
        assert_eq!(plan.frames(f64::NAN).count(), 10);
    }
}

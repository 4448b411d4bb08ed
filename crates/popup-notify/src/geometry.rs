//! Screen geometry queries and bottom-right placement.

use serde::{Deserialize, Serialize};

use crate::{PopupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Screen rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// `None` if the edge does not fit in an `i32`.
    pub fn right(&self) -> Option<i32> {
        offset(self.x, self.width)
    }

    pub fn bottom(&self) -> Option<i32> {
        offset(self.y, self.height)
    }
}

fn offset(origin: i32, extent: u32) -> Option<i32> {
    origin.checked_add(i32::try_from(extent).ok()?)
}

/// One-shot screen queries used when the popup is first shown.
pub trait ScreenGeometry: Send + Sync {
    /// Full bounds of the screen hosting the popup.
    fn bounds(&self) -> Rect;

    /// Usable area of that screen (excludes task bars and docks).
    fn work_area(&self) -> Rect;
}

/// Geometry with fixed rectangles, for headless hosts and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeometry {
    pub bounds: Rect,
    pub work_area: Rect,
}

impl ScreenGeometry for FixedGeometry {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn work_area(&self) -> Rect {
        self.work_area
    }
}

/// Top-left origin that docks a popup of `size` in the bottom-right corner.
///
/// The right edge follows the screen bounds and the bottom edge follows the
/// work area. Any edge outside `[0, work area]` is a caller bug and fails.
pub fn bottom_right_origin(size: Size, geometry: &dyn ScreenGeometry) -> Result<Point> {
    let bounds = geometry.bounds();
    let work = geometry.work_area();

    if size.height > work.height {
        return Err(PopupError::Geometry(format!(
            "height {} is out of bounds (work area height {})",
            size.height, work.height
        )));
    }

    let right = edge("right", bounds.right())?;
    check_edge("right", right, edge("work area right", work.right())?)?;

    let bottom = edge("bottom", work.bottom())?;
    check_edge("bottom", bottom, bottom)?;

    Ok(Point {
        x: back_off("width", right, size.width)?,
        y: back_off("height", bottom, size.height)?,
    })
}

fn edge(name: &str, position: Option<i32>) -> Result<i32> {
    position.ok_or_else(|| PopupError::Geometry(format!("{name} edge overflows")))
}

fn back_off(name: &str, edge: i32, extent: u32) -> Result<i32> {
    i32::try_from(extent)
        .ok()
        .and_then(|extent| edge.checked_sub(extent))
        .ok_or_else(|| PopupError::Geometry(format!("{name} {extent} overflows from edge {edge}")))
}

fn check_edge(name: &str, position: i32, limit: i32) -> Result<()> {
    if position < 0 {
        return Err(PopupError::Geometry(format!("{name} must be at least 0, got {position}")));
    }
    if position > limit {
        return Err(PopupError::Geometry(format!(
            "{name} {position} is out of bounds (limit {limit})"
        )));
    }
    Ok(())
}

//! Self-closing notification popup lifecycle.
//!
//! Keeps a single popup alive while short-lived messages are pending,
//! ages them out on a periodic sweep, and fades the popup away once it
//! is empty or dismissed by a click. Rendering, screen geometry and the
//! UI thread are supplied by the host through the traits in
//! [`surface`], [`geometry`] and [`dispatcher`].

pub mod clock;
mod close;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod fade;
pub mod geometry;
pub mod message;
mod scheduler;
pub mod store;
pub mod surface;

// Re-exports for convenience
pub use clock::{Clock, TokioClock};
pub use config::PopupConfig;
pub use controller::{PopupController, PopupId};
pub use dispatcher::{InlineDispatcher, ThreadDispatcher, UiDispatcher};
pub use geometry::{FixedGeometry, Point, Rect, ScreenGeometry, Size};
pub use message::Message;
pub use store::MessageStore;
pub use surface::{ClickHandle, PopupSurface, SurfaceFactory};

/// Errors that can occur while driving a popup.
#[derive(Debug, thiserror::Error)]
pub enum PopupError {
    #[error("Geometry precondition failed: {0}")]
    Geometry(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("UI dispatcher is closed")]
    DispatcherClosed,

    #[error("UI job was aborted before completing")]
    DispatchAborted,

    #[error("Invalid config {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
}

/// Result type alias for popup operations.
pub type Result<T> = std::result::Result<T, PopupError>;

/// Format a message and hand it to a [`PopupController`].
///
/// ```ignore
/// popup_message!(controller, "Copied {} files to {}", count, target);
/// ```
#[macro_export]
macro_rules! popup_message {
    ($controller:expr, $($arg:tt)+) => {
        $controller.add_message(::std::format!($($arg)+))
    };
}

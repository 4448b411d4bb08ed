#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use popup_notify::{
    ClickHandle, FixedGeometry, InlineDispatcher, Message, Point, PopupConfig, PopupController,
    PopupError, PopupSurface, Rect, ScreenGeometry, Size, SurfaceFactory, UiDispatcher,
};

pub const SCREEN: Rect = Rect { x: 0, y: 0, width: 1920, height: 1080 };
pub const WORK_AREA: Rect = Rect { x: 0, y: 0, width: 1920, height: 1040 };
pub const POPUP_SIZE: Size = Size { width: 320, height: 180 };

#[derive(Debug, Default)]
struct SurfaceState {
    shown_at: Option<Point>,
    rows: Vec<String>,
    opacity_history: Vec<f64>,
    opacity: f64,
    closed: u32,
}

type RenderHook = Box<dyn FnOnce() + Send>;

/// Surface that records every call made to it.
pub struct FakeSurface {
    clicks: ClickHandle,
    fail_close: bool,
    state: Mutex<SurfaceState>,
    on_empty_render: Mutex<Option<RenderHook>>,
}

impl FakeSurface {
    /// Run `hook` once, the next time the popup is rendered with no rows.
    pub fn on_next_empty_render(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_empty_render.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn click(&self) {
        self.clicks.click();
    }

    pub fn rows(&self) -> Vec<String> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn opacity(&self) -> f64 {
        self.state.lock().unwrap().opacity
    }

    pub fn opacity_history(&self) -> Vec<f64> {
        self.state.lock().unwrap().opacity_history.clone()
    }

    pub fn closed(&self) -> u32 {
        self.state.lock().unwrap().closed
    }

    pub fn shown_at(&self) -> Option<Point> {
        self.state.lock().unwrap().shown_at
    }
}

impl PopupSurface for FakeSurface {
    fn size(&self) -> Size {
        POPUP_SIZE
    }

    fn show_at(&self, origin: Point) {
        self.state.lock().unwrap().shown_at = Some(origin);
    }

    fn render(&self, rows: &[Message]) {
        self.state.lock().unwrap().rows = rows.iter().map(|m| m.text().to_string()).collect();
        if rows.is_empty() {
            let hook = self.on_empty_render.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    fn opacity(&self) -> f64 {
        self.state.lock().unwrap().opacity
    }

    fn set_opacity(&self, opacity: f64) {
        let mut state = self.state.lock().unwrap();
        state.opacity = opacity;
        state.opacity_history.push(opacity);
    }

    fn close(&self) -> popup_notify::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        if self.fail_close {
            return Err(PopupError::Surface("window handle already destroyed".into()));
        }
        Ok(())
    }
}

/// Factory that keeps every surface it hands out.
#[derive(Default)]
pub struct FakeFactory {
    surfaces: Mutex<Vec<Arc<FakeSurface>>>,
    fail_close: AtomicBool,
}

impl FakeFactory {
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }

    pub fn surface(&self, index: usize) -> Arc<FakeSurface> {
        self.surfaces.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> Arc<FakeSurface> {
        self.surfaces.lock().unwrap().last().cloned().expect("no surface created")
    }
}

impl SurfaceFactory for FakeFactory {
    fn create(&self, clicks: ClickHandle) -> popup_notify::Result<Arc<dyn PopupSurface>> {
        let surface = Arc::new(FakeSurface {
            clicks,
            fail_close: self.fail_close.load(Ordering::SeqCst),
            state: Mutex::new(SurfaceState {
                opacity: 1.0,
                ..Default::default()
            }),
            on_empty_render: Mutex::new(None),
        });
        self.surfaces.lock().unwrap().push(surface.clone());
        Ok(surface)
    }
}

pub struct Harness {
    pub controller: PopupController,
    pub factory: Arc<FakeFactory>,
}

impl Harness {
    /// Inline dispatcher, default policy, full-HD screen.
    pub fn new() -> Self {
        Self::with(PopupConfig::default(), default_geometry(), Arc::new(InlineDispatcher))
    }

    pub fn with(
        config: PopupConfig,
        geometry: Arc<dyn ScreenGeometry>,
        ui: Arc<dyn UiDispatcher>,
    ) -> Self {
        let factory = Arc::new(FakeFactory::default());
        let controller = PopupController::builder(ui, factory.clone(), geometry)
            .config(config)
            .build()
            .expect("valid config");
        Self {
            controller,
            factory,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.controller
            .messages()
            .iter()
            .map(|m| m.text().to_string())
            .collect()
    }
}

pub fn default_geometry() -> Arc<dyn ScreenGeometry> {
    Arc::new(FixedGeometry {
        bounds: SCREEN,
        work_area: WORK_AREA,
    })
}

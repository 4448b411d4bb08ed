//! Singleton gate that owns the live popup.
//!
//! The gate is a mutex over `Absent | Creating | Active` plus a bounded
//! backlog. Only the producer that moves the gate from `Absent` to
//! `Creating` builds a popup; everyone who arrives while a popup is being
//! built or torn down parks their text in the backlog, which is drained
//! into the next store in arrival order.
//!
//! Lock order is gate, then store. The close sequence only takes the store
//! lock until it releases the slot at the very end.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, TokioClock};
use crate::close;
use crate::config::PopupConfig;
use crate::dispatcher::{UiDispatcher, invoke_blocking};
use crate::fade::FadePlan;
use crate::geometry::{self, ScreenGeometry};
use crate::message::Message;
use crate::scheduler;
use crate::store::MessageStore;
use crate::surface::{ClickHandle, PopupSurface, SurfaceFactory};
use crate::Result;

/// Identifies one popup instance for the lifetime of its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PopupId(u64);

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup-{}", self.0)
    }
}

/// One live popup: its window, its messages and its timer.
pub(crate) struct PopupInstance {
    pub(crate) id: PopupId,
    pub(crate) store: MessageStore,
    pub(crate) surface: Arc<dyn PopupSurface>,
    /// Stops the expiry timer.
    pub(crate) ticks: CancellationToken,
    closing: AtomicBool,
}

impl PopupInstance {
    fn new(id: PopupId, surface: Arc<dyn PopupSurface>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            store: MessageStore::new(clock),
            surface,
            ticks: CancellationToken::new(),
            closing: AtomicBool::new(false),
        }
    }

    /// Claim the right to close this popup. Only the first caller wins.
    fn begin_close(&self) -> bool {
        self.closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

enum Slot {
    Absent,
    Creating,
    Active(Arc<PopupInstance>),
}

struct Gate {
    slot: Slot,
    backlog: VecDeque<String>,
}

pub(crate) struct ControllerInner {
    me: Weak<ControllerInner>,
    config: PopupConfig,
    runtime: Handle,
    ui: Arc<dyn UiDispatcher>,
    surfaces: Arc<dyn SurfaceFactory>,
    geometry: Arc<dyn ScreenGeometry>,
    clock: Arc<dyn Clock>,
    gate: Mutex<Gate>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

/// Owns the notification popup and drives its lifecycle.
///
/// Cheap to clone; all clones share one popup.
#[derive(Clone)]
pub struct PopupController {
    inner: Arc<ControllerInner>,
}

/// Builder for [`PopupController`].
pub struct PopupControllerBuilder {
    ui: Arc<dyn UiDispatcher>,
    surfaces: Arc<dyn SurfaceFactory>,
    geometry: Arc<dyn ScreenGeometry>,
    config: PopupConfig,
    clock: Option<Arc<dyn Clock>>,
    runtime: Option<Handle>,
}

impl PopupControllerBuilder {
    pub fn config(mut self, config: PopupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Runtime that hosts the expiry timer and the close sequence.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the config and assemble the controller.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was supplied and this is called outside a
    /// tokio runtime.
    pub fn build(self) -> Result<PopupController> {
        self.config.validate()?;
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);

        let inner = Arc::new_cyclic(|me| ControllerInner {
            me: me.clone(),
            config: self.config,
            runtime,
            ui: self.ui,
            surfaces: self.surfaces,
            geometry: self.geometry,
            clock,
            gate: Mutex::new(Gate {
                slot: Slot::Absent,
                backlog: VecDeque::new(),
            }),
            next_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        });

        Ok(PopupController { inner })
    }
}

impl PopupController {
    pub fn builder(
        ui: Arc<dyn UiDispatcher>,
        surfaces: Arc<dyn SurfaceFactory>,
        geometry: Arc<dyn ScreenGeometry>,
    ) -> PopupControllerBuilder {
        PopupControllerBuilder {
            ui,
            surfaces,
            geometry,
            config: PopupConfig::default(),
            clock: None,
            runtime: None,
        }
    }

    /// Show `text` in the popup, opening the popup first if needed.
    ///
    /// Never fails; a message that cannot be shown is logged and dropped.
    pub fn add_message(&self, text: impl Into<String>) {
        self.inner.add_message(text.into());
    }

    /// Close the current popup with the given fade. No-op if none is open
    /// or it is already closing.
    pub fn close(&self, fade: Duration) {
        if let Some(instance) = self.inner.active_instance() {
            self.inner.close_instance(instance, fade);
        }
    }

    /// Close the current popup the way a click on it would.
    pub fn dismiss(&self) {
        self.close(self.inner.config.click_fade());
    }

    /// Stop accepting messages and close whatever is open.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Whether a popup currently occupies the slot (including while fading).
    pub fn is_active(&self) -> bool {
        self.inner.active_instance().is_some()
    }

    pub fn current_popup(&self) -> Option<PopupId> {
        self.inner.active_instance().map(|i| i.id)
    }

    /// Rows of the current popup, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .active_instance()
            .map(|i| i.store.snapshot())
            .unwrap_or_default()
    }

    pub fn message_count(&self) -> usize {
        self.inner
            .active_instance()
            .map_or(0, |i| i.store.count())
    }

    /// Texts waiting for the next popup.
    pub fn backlog_len(&self) -> usize {
        self.inner.lock_gate().backlog.len()
    }

    pub fn config(&self) -> &PopupConfig {
        &self.inner.config
    }
}

impl ControllerInner {
    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_instance(&self) -> Option<Arc<PopupInstance>> {
        match &self.lock_gate().slot {
            Slot::Active(instance) => Some(instance.clone()),
            _ => None,
        }
    }

    fn add_message(&self, text: String) {
        if self.shut_down.load(Ordering::Acquire) {
            tracing::debug!("Message ignored after shutdown");
            return;
        }

        let mut gate = self.lock_gate();
        match &gate.slot {
            Slot::Active(instance) if !instance.is_closing() => {
                let instance = instance.clone();
                match instance.store.try_append(text) {
                    Ok(()) => {
                        drop(gate);
                        self.refresh(&instance);
                    }
                    // Retired between the closing check and the append.
                    Err(text) => self.push_backlog(&mut gate, text),
                }
            }
            Slot::Active(_) | Slot::Creating => self.push_backlog(&mut gate, text),
            Slot::Absent => {
                gate.slot = Slot::Creating;
                self.push_backlog(&mut gate, text);
                drop(gate);
                self.open();
            }
        }
    }

    fn push_backlog(&self, gate: &mut Gate, text: String) {
        if gate.backlog.len() >= self.config.backlog_capacity {
            tracing::warn!(
                capacity = self.config.backlog_capacity,
                "Popup backlog full, message dropped"
            );
            return;
        }
        gate.backlog.push_back(text);
    }

    /// Build, place and show a popup, then install it and drain the backlog.
    ///
    /// The caller must have moved the gate to `Creating`.
    fn open(&self) {
        let id = PopupId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let clicks = ClickHandle::new(self.me.clone(), id);
        let surfaces = self.surfaces.clone();
        let geometry = self.geometry.clone();

        let built = invoke_blocking(self.ui.as_ref(), move || {
            build_surface(surfaces.as_ref(), geometry.as_ref(), clicks)
        })
        .and_then(|surface| surface);

        let surface = match built {
            Ok(surface) => surface,
            Err(e) => {
                let mut gate = self.lock_gate();
                let dropped = gate.backlog.len();
                gate.backlog.clear();
                gate.slot = Slot::Absent;
                drop(gate);
                tracing::error!(popup = %id, dropped, "Failed to open popup: {e}");
                return;
            }
        };

        let instance = Arc::new(PopupInstance::new(id, surface, self.clock.clone()));
        {
            let mut gate = self.lock_gate();
            for text in gate.backlog.drain(..) {
                instance.store.append(text);
            }
            gate.slot = Slot::Active(instance.clone());
        }
        tracing::info!(popup = %id, messages = instance.store.count(), "Popup opened");

        self.runtime.spawn(scheduler::run(
            self.me.clone(),
            instance.clone(),
            self.config.tick_interval(),
        ));
        self.refresh(&instance);

        if self.shut_down.load(Ordering::Acquire) {
            self.close_instance(instance, self.config.auto_fade());
        }
    }

    /// Open a popup for texts that arrived while the previous one closed.
    fn flush_backlog(&self) {
        let mut gate = self.lock_gate();
        if !matches!(gate.slot, Slot::Absent) || gate.backlog.is_empty() {
            return;
        }
        gate.slot = Slot::Creating;
        drop(gate);
        tracing::debug!("Replaying popup backlog");
        self.open();
    }

    /// Re-render the popup from its store on the UI thread.
    fn refresh(&self, instance: &Arc<PopupInstance>) {
        let instance = instance.clone();
        let posted = self.ui.post(Box::new(move || {
            let rows = instance.store.snapshot();
            instance.surface.render(&rows);
        }));
        if let Err(e) = posted {
            tracing::debug!("Popup refresh skipped: {e}");
        }
    }

    /// Expiry tick for `instance`. Returns whether the timer should keep running.
    pub(crate) fn on_tick(&self, instance: &Arc<PopupInstance>) -> bool {
        let remaining = instance.store.sweep_expired(self.config.max_age());
        self.refresh(instance);
        if remaining > 0 {
            return true;
        }

        {
            let gate = self.lock_gate();
            if !matches!(&gate.slot, Slot::Active(i) if i.id == instance.id) {
                tracing::debug!(popup = %instance.id, "Tick for popup no longer current");
                return false;
            }
            // A producer may have appended after the sweep.
            if instance.store.count() > 0 {
                return true;
            }
            if !instance.begin_close() {
                return false;
            }
        }
        self.spawn_close(instance.clone(), self.config.auto_fade());
        false
    }

    /// Click path: close `id` with the click fade if it is still current.
    pub(crate) fn dismiss(&self, id: PopupId) {
        match self.active_instance() {
            Some(instance) if instance.id == id => {
                self.close_instance(instance, self.config.click_fade());
            }
            _ => tracing::debug!(popup = %id, "Click on popup no longer current"),
        }
    }

    fn close_instance(&self, instance: Arc<PopupInstance>, fade: Duration) {
        // Claimed under the gate so no producer can append between the
        // claim and the store being cleared.
        let claimed = {
            let _gate = self.lock_gate();
            instance.begin_close()
        };
        if !claimed {
            tracing::debug!(popup = %instance.id, "Popup already closing");
            return;
        }
        self.spawn_close(instance, fade);
    }

    /// Start the close sequence. The caller has won `begin_close`.
    fn spawn_close(&self, instance: Arc<PopupInstance>, fade: Duration) {
        tracing::info!(
            popup = %instance.id,
            fade_ms = fade.as_millis() as u64,
            "Closing popup"
        );
        let plan = FadePlan::new(fade, self.config.fade_steps);
        self.runtime.spawn(close::run(
            self.me.clone(),
            self.ui.clone(),
            instance,
            plan,
        ));
    }

    /// Free the slot held by `id` once its window has been disposed.
    pub(crate) fn release(&self, id: PopupId) {
        let mut gate = self.lock_gate();
        if !matches!(&gate.slot, Slot::Active(i) if i.id == id) {
            return;
        }
        gate.slot = Slot::Absent;
        let replay = !gate.backlog.is_empty() && !self.shut_down.load(Ordering::Acquire);
        drop(gate);
        tracing::info!(popup = %id, "Popup released");

        if replay {
            let me = self.me.clone();
            let posted = self.ui.post(Box::new(move || {
                if let Some(inner) = me.upgrade() {
                    inner.flush_backlog();
                }
            }));
            if let Err(e) = posted {
                tracing::warn!("Could not schedule backlog replay: {e}");
            }
        }
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let active = {
            let mut gate = self.lock_gate();
            let dropped = gate.backlog.len();
            gate.backlog.clear();
            if dropped > 0 {
                tracing::warn!(dropped, "Discarding popup backlog on shutdown");
            }
            match &gate.slot {
                Slot::Active(instance) => Some(instance.clone()),
                _ => None,
            }
        };
        tracing::info!("Popup controller shutting down");
        if let Some(instance) = active {
            self.close_instance(instance, self.config.auto_fade());
        }
    }
}

/// Runs on the UI thread.
fn build_surface(
    surfaces: &dyn SurfaceFactory,
    geometry: &dyn ScreenGeometry,
    clicks: ClickHandle,
) -> Result<Arc<dyn PopupSurface>> {
    let surface = surfaces.create(clicks)?;
    let origin = match geometry::bottom_right_origin(surface.size(), geometry) {
        Ok(origin) => origin,
        Err(e) => {
            if let Err(close_err) = surface.close() {
                tracing::warn!("Failed to dispose unplaced popup: {close_err}");
            }
            return Err(e);
        }
    };
    surface.show_at(origin);
    Ok(surface)
}

impl fmt::Debug for PopupController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupController")
            .field("current_popup", &self.current_popup())
            .field("config", &self.inner.config)
            .finish()
    }
}


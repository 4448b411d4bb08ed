//! "Run on the UI thread" capability.
//!
//! Every call that touches the popup surface goes through a
//! [`UiDispatcher`]. Store mutations never do; they only need the store
//! lock.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread::{self, ThreadId};

use tokio::sync::oneshot;

use crate::{PopupError, Result};

/// A unit of work for the UI thread.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs on the host's UI thread.
pub trait UiDispatcher: Send + Sync {
    /// Queue `job` for the UI thread (or run it now if already there).
    fn post(&self, job: UiJob) -> Result<()>;

    /// Whether the calling thread is the UI thread.
    fn is_ui_thread(&self) -> bool;
}

/// Run `f` on the UI thread and block until it returns.
///
/// Runs inline when already on the UI thread, so it never waits on itself.
pub fn invoke_blocking<R, F>(dispatcher: &dyn UiDispatcher, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    if dispatcher.is_ui_thread() {
        return Ok(f());
    }
    let (tx, rx) = mpsc::sync_channel(1);
    dispatcher.post(Box::new(move || {
        let _ = tx.send(f());
    }))?;
    rx.recv().map_err(|_| PopupError::DispatchAborted)
}

/// Async twin of [`invoke_blocking`] for use inside runtime tasks.
pub async fn invoke_async<R, F>(dispatcher: &dyn UiDispatcher, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    if dispatcher.is_ui_thread() {
        return Ok(f());
    }
    let (tx, rx) = oneshot::channel();
    dispatcher.post(Box::new(move || {
        let _ = tx.send(f());
    }))?;
    rx.await.map_err(|_| PopupError::DispatchAborted)
}

/// Treats whichever thread calls it as the UI thread.
///
/// Suitable for headless hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn post(&self, job: UiJob) -> Result<()> {
        job();
        Ok(())
    }

    fn is_ui_thread(&self) -> bool {
        true
    }
}

/// Dedicated UI thread fed through a job channel.
///
/// Jobs run in post order. A panicking job is logged and the thread keeps
/// serving; its waiter sees [`PopupError::DispatchAborted`].
pub struct ThreadDispatcher {
    tx: Mutex<Option<mpsc::Sender<UiJob>>>,
    thread_id: ThreadId,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ThreadDispatcher {
    /// Spawn the UI thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<UiJob>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("UI job panicked");
                    }
                }
                tracing::debug!("UI dispatcher thread stopped");
            })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop accepting jobs and wait for the queued ones to finish.
    ///
    /// Must not be called from the UI thread itself.
    pub fn shutdown(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("UI dispatcher thread exited with a panic");
            }
        }
    }
}

impl UiDispatcher for ThreadDispatcher {
    fn post(&self, job: UiJob) -> Result<()> {
        let tx = self.tx.lock().map_err(|_| PopupError::DispatcherClosed)?;
        let tx = tx.as_ref().ok_or(PopupError::DispatcherClosed)?;
        tx.send(job).map_err(|_| PopupError::DispatcherClosed)
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

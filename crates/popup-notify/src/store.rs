//! Lock-guarded message list owned by one popup instance.
//!
//! Once [`MessageStore::clear`] runs the store is retired: the list is
//! dropped and every later call is a no-op. A retired store is never
//! reopened; the next popup gets a fresh one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

use crate::clock::Clock;
use crate::message::Message;

/// Ordered, thread-safe collection of timestamped messages.
pub struct MessageStore {
    /// `None` once retired.
    messages: Mutex<Option<Vec<Message>>>,
    clock: Arc<dyn Clock>,
}

impl MessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: Mutex::new(Some(Vec::new())),
            clock,
        }
    }

    // A panic while holding the lock cannot leave the Vec half-mutated,
    // so the poisoned guard is still safe to use.
    fn guard(&self) -> MutexGuard<'_, Option<Vec<Message>>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamp `text` with the current time and push it to the tail.
    ///
    /// Returns `false` if the store has been retired.
    pub fn append(&self, text: impl Into<String>) -> bool {
        self.try_append(text.into()).is_ok()
    }

    /// Like [`append`](Self::append) but hands the text back when retired.
    pub(crate) fn try_append(&self, text: String) -> Result<(), String> {
        let mut guard = self.guard();
        let Some(messages) = guard.as_mut() else {
            tracing::debug!("Append on retired message store ignored");
            return Err(text);
        };
        messages.push(Message::new(text, self.clock.now()));
        Ok(())
    }

    /// Remove every message at least `max_age` old and return the survivor count.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        self.sweep_expired_at(max_age, self.clock.now())
    }

    /// [`sweep_expired`](Self::sweep_expired) against an explicit `now`.
    pub fn sweep_expired_at(&self, max_age: Duration, now: DateTime<Local>) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let mut guard = self.guard();
        let Some(messages) = guard.as_mut() else {
            return 0;
        };

        let before = messages.len();
        messages.retain(|m| m.age(now) < max_age);
        let expired = before - messages.len();
        if expired > 0 {
            tracing::debug!(expired, remaining = messages.len(), "Swept expired messages");
        }
        messages.len()
    }

    /// Drop all messages and retire the store.
    pub fn clear(&self) {
        let mut guard = self.guard();
        if let Some(messages) = guard.take() {
            tracing::debug!(dropped = messages.len(), "Message store retired");
        }
    }

    pub fn count(&self) -> usize {
        self.guard().as_ref().map_or(0, Vec::len)
    }

    pub fn is_retired(&self) -> bool {
        self.guard().is_none()
    }

    /// Copy of the rows in display order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.guard().as_ref().cloned().unwrap_or_default()
    }
}

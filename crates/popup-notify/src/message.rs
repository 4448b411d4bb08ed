//! Message row type shown by the popup.

use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;

/// A single notification line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    text: String,
    created_at: DateTime<Local>,
}

impl Message {
    pub fn new(text: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            created_at,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Age relative to `now`. Clamped to zero if `now` is earlier.
    pub fn age(&self, now: DateTime<Local>) -> TimeDelta {
        (now - self.created_at).max(TimeDelta::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_is_never_negative() {
        let now = Local::now();
        let msg = Message::new("late", now + TimeDelta::seconds(5));
        assert_eq!(msg.age(now), TimeDelta::zero());
    }

    #[test]
    fn test_serializes_text_and_timestamp() {
        let now = Local::now();
        let msg = Message::new("hello", now);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["text"], "hello");
        assert!(value["created_at"].is_string());
    }
}

//! Popup timing policy: defaults, environment overrides and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PopupError, Result};

pub const DEFAULT_MAX_AGE_MS: u64 = 3000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_AUTO_FADE_MS: u64 = 0;
pub const DEFAULT_CLICK_FADE_MS: u64 = 1000;
pub const DEFAULT_FADE_STEPS: u32 = 100;
pub const DEFAULT_BACKLOG_CAPACITY: usize = 256;

const MAX_FADE_MS: u64 = 60_000;

/// Timing and capacity knobs for a [`PopupController`](crate::PopupController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Messages at least this old are swept.
    pub max_age_ms: u64,
    /// Period of the expiry sweep.
    pub tick_interval_ms: u64,
    /// Fade used when the popup empties on its own.
    pub auto_fade_ms: u64,
    /// Fade used when the user clicks the popup away.
    pub click_fade_ms: u64,
    /// Opacity steps per full fade.
    pub fade_steps: u32,
    /// Messages held while a popup is being created or torn down.
    pub backlog_capacity: usize,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            auto_fade_ms: DEFAULT_AUTO_FADE_MS,
            click_fade_ms: DEFAULT_CLICK_FADE_MS,
            fade_steps: DEFAULT_FADE_STEPS,
            backlog_capacity: DEFAULT_BACKLOG_CAPACITY,
        }
    }
}

impl PopupConfig {
    /// Defaults with `POPUP_*` environment overrides applied.
    ///
    /// Unparsable values are ignored and leave the default in place.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a JSON settings blob; missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PopupError::InvalidConfig {
            key: "json",
            reason: e.to_string(),
        })
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let g = |key: &str| lookup(key).unwrap_or_default();

        self.max_age_ms = parse_u64(&g("POPUP_MAX_AGE_MS"), self.max_age_ms);
        self.tick_interval_ms = parse_u64(&g("POPUP_TICK_INTERVAL_MS"), self.tick_interval_ms);
        self.auto_fade_ms = parse_u64(&g("POPUP_AUTO_FADE_MS"), self.auto_fade_ms);
        self.click_fade_ms = parse_u64(&g("POPUP_CLICK_FADE_MS"), self.click_fade_ms);
        self.fade_steps = parse_u32(&g("POPUP_FADE_STEPS"), self.fade_steps);
        self.backlog_capacity = parse_usize(&g("POPUP_BACKLOG_CAPACITY"), self.backlog_capacity);
        self
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        validate_range("tick_interval_ms", self.tick_interval_ms, 50, 60_000)?;
        if self.max_age_ms < self.tick_interval_ms {
            return Err(invalid(
                "max_age_ms",
                "must be at least tick_interval_ms".into(),
            ));
        }
        validate_range("auto_fade_ms", self.auto_fade_ms, 0, MAX_FADE_MS)?;
        validate_range("click_fade_ms", self.click_fade_ms, 0, MAX_FADE_MS)?;
        validate_range("fade_steps", u64::from(self.fade_steps), 1, 1000)?;
        if self.backlog_capacity == 0 {
            return Err(invalid("backlog_capacity", "must be at least 1".into()));
        }
        Ok(())
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn auto_fade(&self) -> Duration {
        Duration::from_millis(self.auto_fade_ms)
    }

    pub fn click_fade(&self) -> Duration {
        Duration::from_millis(self.click_fade_ms)
    }
}

fn invalid(key: &'static str, reason: String) -> PopupError {
    PopupError::InvalidConfig { key, reason }
}

fn validate_range(key: &'static str, value: u64, min: u64, max: u64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(invalid(key, format!("must be between {min} and {max}")));
    }
    Ok(())
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.trim().parse().unwrap_or(default)
}

fn parse_u32(s: &str, default: u32) -> u32 {
    if s.is_empty() {
        return default;
    }
    s.trim().parse().unwrap_or(default)
}

fn parse_usize(s: &str, default: usize) -> usize {
    if s.is_empty() {
        return default;
    }
    s.trim().parse().unwrap_or(default)
}

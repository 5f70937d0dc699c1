//! Counters for the running tracker session.
//!
//! These track what happened since the process started. They are shared
//! through an `Arc` so the status display and the shutdown summary can read
//! them while the main loop updates them.

use crate::collector::ActivityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the current session.
#[derive(Debug)]
pub struct SessionStats {
    /// Number of key presses recorded
    key_presses: AtomicU64,
    /// Number of mouse clicks recorded
    mouse_clicks: AtomicU64,
    /// Number of successful saves
    saves_completed: AtomicU64,
    /// Number of saves that failed
    saves_failed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            key_presses: AtomicU64::new(0),
            mouse_clicks: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            saves_failed: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Count one recorded action.
    pub fn record_activity(&self, kind: ActivityKind) {
        let counter = match kind {
            ActivityKind::KeyPress => &self.key_presses,
            ActivityKind::MouseClick => &self.mouse_clicks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save(&self, ok: bool) {
        let counter = if ok {
            &self.saves_completed
        } else {
            &self.saves_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key_presses: self.key_presses.load(Ordering::Relaxed),
            mouse_clicks: self.mouse_clicks.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            saves_failed: self.saves_failed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Key presses recorded: {}\n\
             - Mouse clicks recorded: {}\n\
             - Saves completed: {}\n\
             - Saves failed: {}\n\
             - Session duration: {} seconds",
            stats.key_presses,
            stats.mouse_clicks,
            stats.saves_completed,
            stats.saves_failed,
            stats.session_duration_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub key_presses: u64,
    pub mouse_clicks: u64,
    pub saves_completed: u64,
    pub saves_failed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared session statistics.
pub type SharedSessionStats = Arc<SessionStats>;

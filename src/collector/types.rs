//! Activity event types and raw input filtering.
//!
//! Only discrete presses count as activity. Key releases, autorepeat while a
//! key is held, and pointer motion are dropped before they reach the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `EV_KEY` from `linux/input-event-codes.h`.
pub const EV_KEY: u16 = 0x01;

/// First mouse/joystick button code (`BTN_MISC`).
const BTN_FIRST: u16 = 0x100;
/// First key code past the button block (`KEY_OK`).
const BTN_END: u16 = 0x160;

/// Key value meaning "pressed". 0 is release, 2 is autorepeat.
const VALUE_PRESSED: i32 = 1;

/// What kind of action was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// A keyboard key went down
    KeyPress,
    /// A mouse button went down
    MouseClick,
}

/// One detected action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
}

impl ActivityEvent {
    pub fn at(timestamp: DateTime<Utc>, kind: ActivityKind) -> Self {
        Self { timestamp, kind }
    }

    /// Whole seconds since the epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Classify a raw input event by its type, code and value.
///
/// Returns `None` for anything that is not a key or button press.
pub fn classify(event_type: u16, code: u16, value: i32) -> Option<ActivityKind> {
    if event_type != EV_KEY || value != VALUE_PRESSED {
        return None;
    }

    if (BTN_FIRST..BTN_END).contains(&code) {
        Some(ActivityKind::MouseClick)
    } else {
        Some(ActivityKind::KeyPress)
    }
}

//! APM Tracker - actions-per-minute tracking from raw input devices.
//!
//! This library records a timestamp for every key press and mouse click,
//! keeps up to seven days of them in a fixed-capacity ring buffer, persists
//! that buffer to a compact binary file, and answers actions-per-minute
//! queries over trailing windows.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         APM Tracker                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Collector  │──▶│   Tracker   │──▶│ EventStore  │         │
//! │  │   (evdev)   │   │ (main loop) │   │ (ring buf)  │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                           │                 │                │
//! │                           ▼                 ▼                │
//! │                    ┌─────────────┐   ┌─────────────┐         │
//! │                    │    Codec    │   │    Rate     │         │
//! │                    │ (data file) │   │   (APM)     │         │
//! │                    └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use apm_tracker::core::{compute_apm, EventStore};
//! use std::num::NonZeroUsize;
//!
//! let mut store = EventStore::new(NonZeroUsize::new(1_000).unwrap());
//! let now = 1_700_000_000;
//! for i in 0..30 {
//!     store.record_event(now - i);
//! }
//!
//! assert_eq!(compute_apm(&store, 1, now).unwrap(), 30.0);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod session;
pub mod tracker;

// Re-export key types at crate root for convenience
pub use collector::{ActivityEvent, ActivityKind, Collector, CollectorConfig, CollectorError};
pub use config::{Config, ConfigError, SourceConfig};
pub use core::{
    compute_apm, ActivityRecord, ApmSummary, ApmWindow, EventStore, FormatError, PersistError,
    SaveOutcome, Timestamp,
};
pub use session::{SessionStats, SharedSessionStats};
pub use tracker::{TickReport, Tracker};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Core functionality for the APM tracker.
//!
//! This module contains:
//! - The ring-buffer event store
//! - Actions-per-minute calculation over trailing windows
//! - Binary persistence of the store

pub mod codec;
pub mod rate;
pub mod store;

// Re-export commonly used types
pub use codec::{FormatError, PersistError, SaveOutcome, FORMAT_VERSION, MAGIC};
pub use rate::{compute_apm, ApmSummary, ApmWindow, RateError};
pub use store::{ActivityRecord, ChronologicalView, EventStore, Timestamp, DEFAULT_CAPACITY};

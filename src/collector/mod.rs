//! Event collection module for the APM tracker.
//!
//! This module turns raw input devices into a stream of discrete activity
//! events. Only presses are forwarded; releases, autorepeat and motion are
//! filtered here so the store sees one event per action.

pub mod types;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(not(target_os = "linux"))]
pub mod noop;

// Re-export commonly used types
pub use types::{classify, ActivityEvent, ActivityKind};

#[cfg(target_os = "linux")]
pub use linux::{check_permission, CollectorConfig, CollectorError, LinuxCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "linux")]
pub type Collector = LinuxCollector;

#[cfg(not(target_os = "linux"))]
pub use noop::{check_permission, CollectorConfig, CollectorError, NoopCollector};

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "linux"))]
pub type Collector = NoopCollector;

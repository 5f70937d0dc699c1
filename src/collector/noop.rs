//! Stand-in collector for targets without `/dev/input`.
//!
//! Keyboard and mouse actions are only read through evdev. Elsewhere the
//! binary still builds so `stats`, `clear` and `config` can work on a copied
//! data file, while `start` records nothing.

use crate::collector::types::ActivityEvent;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which kinds of action to record. Ignored here.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    NoDevices,
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::NoDevices => {
                write!(f, "Keyboard and mouse capture needs Linux evdev devices")
            }
        }
    }
}

impl std::error::Error for CollectorError {}

/// Collector whose channel stays open but never carries an action.
pub struct NoopCollector {
    _config: CollectorConfig,
    // Held so the tracker loop sees an idle channel rather than a disconnect.
    _sender: Sender<ActivityEvent>,
    receiver: Receiver<ActivityEvent>,
    running: Arc<AtomicBool>,
}

impl NoopCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(10_000);
        Self {
            _config: config,
            _sender: sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag the collector as running. No thread is spawned.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Channel the tracker loop waits on.
    pub fn receiver(&self) -> &Receiver<ActivityEvent> {
        &self.receiver
    }

    /// Always zero: the queue can never fill.
    pub fn dropped_events(&self) -> u64 {
        0
    }
}

/// No device nodes to open, so nothing can be denied.
pub fn check_permission() -> bool {
    true
}

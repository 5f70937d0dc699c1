//! Linux implementation of event collection using evdev.
//!
//! Every `/dev/input/event*` node that reports keys or relative axes is
//! opened read-only and polled from a background thread. Reading these nodes
//! normally requires root or membership in the `input` group.

use crate::collector::types::{classify, ActivityEvent, ActivityKind};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use evdev::{Device, EventType};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sleep between polls when no device had data.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Configuration for which event sources to capture.
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

impl CollectorConfig {
    fn accepts(&self, kind: ActivityKind) -> bool {
        match kind {
            ActivityKind::KeyPress => self.capture_keyboard,
            ActivityKind::MouseClick => self.capture_mouse,
        }
    }
}

/// The evdev event collector.
pub struct LinuxCollector {
    config: CollectorConfig,
    sender: Sender<ActivityEvent>,
    receiver: Receiver<ActivityEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl LinuxCollector {
    /// Create a new collector with the given configuration.
    pub fn new(config: CollectorConfig) -> Self {
        // Use a bounded channel to prevent unbounded memory growth
        let (sender, receiver) = bounded(10_000);

        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            thread_handle: None,
        }
    }

    /// Open the input devices and start polling them in a background thread.
    ///
    /// Returns an error if the collector is already running or no usable
    /// device could be opened.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let devices = open_input_devices()?;
        info!(count = devices.len(), "Monitoring input devices");

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let dropped = self.dropped.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            run_poll_loop(devices, sender, running.clone(), dropped, config);
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing events.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // The thread should exit when running becomes false
            let _ = handle.join();
        }
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for activity events.
    pub fn receiver(&self) -> &Receiver<ActivityEvent> {
        &self.receiver
    }

    /// Events discarded because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for LinuxCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Errors that can occur during event collection.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    /// No keyboard or mouse device could be opened
    NoDevices,
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::NoDevices => write!(
                f,
                "No input devices with keyboard/mouse capabilities could be opened"
            ),
        }
    }
}

impl std::error::Error for CollectorError {}

/// Check whether at least one input device is readable by this process.
pub fn check_permission() -> bool {
    evdev::enumerate().next().is_some()
}

fn open_input_devices() -> Result<Vec<(PathBuf, Device)>, CollectorError> {
    let mut devices = Vec::new();

    for (path, device) in evdev::enumerate() {
        let events = device.supported_events();
        if !events.contains(EventType::KEY) && !events.contains(EventType::RELATIVE) {
            continue;
        }

        if let Err(e) = set_nonblocking(&device) {
            warn!(?path, "Cannot set device non-blocking: {e}");
            continue;
        }

        debug!(?path, name = device.name().unwrap_or("unknown"), "Opened input device");
        devices.push((path, device));
    }

    if devices.is_empty() {
        return Err(CollectorError::NoDevices);
    }
    Ok(devices)
}

fn set_nonblocking(device: &Device) -> std::io::Result<()> {
    let raw_fd = device.as_raw_fd();

    // Preserve existing flags; just OR in O_NONBLOCK.
    let current = unsafe { libc::fcntl(raw_fd, libc::F_GETFL) };
    if current < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let rc = unsafe { libc::fcntl(raw_fd, libc::F_SETFL, current | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn run_poll_loop(
    mut devices: Vec<(PathBuf, Device)>,
    sender: Sender<ActivityEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    config: CollectorConfig,
) {
    while running.load(Ordering::SeqCst) && !devices.is_empty() {
        let mut had_events = false;
        let mut lost = Vec::new();

        for (index, (path, device)) in devices.iter_mut().enumerate() {
            let events = match device.fetch_events() {
                Ok(events) => events,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    // Typically ENODEV after the device was unplugged.
                    warn!(?path, "Stopped reading input device: {e}");
                    lost.push(index);
                    continue;
                }
            };

            for ev in events {
                had_events = true;
                let Some(kind) = classify(ev.event_type().0, ev.code(), ev.value()) else {
                    continue;
                };
                if !config.accepts(kind) {
                    continue;
                }

                let event = ActivityEvent::at(ev.timestamp().into(), kind);
                match sender.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        }

        for index in lost.into_iter().rev() {
            devices.remove(index);
        }

        if !had_events {
            thread::sleep(IDLE_POLL);
        }
    }

    if devices.is_empty() {
        warn!("All input devices were lost; collector stopping");
    }
}

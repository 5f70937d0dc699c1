//! The tracker owns the event store for the lifetime of the process.
//!
//! It is driven by a single control loop: activity events are fed in with
//! [`Tracker::record`], [`Tracker::tick`] is called on every loop iteration
//! to run periodic saves and statistics logging, and [`Tracker::shutdown`]
//! performs the final save. No other thread touches the store.

use crate::collector::ActivityEvent;
use crate::config::{Config, ConfigError};
use crate::core::codec::{self, PersistError, SaveOutcome};
use crate::core::{compute_apm, ApmSummary, EventStore, RateError, Timestamp};
use crate::session::{SessionStats, SharedSessionStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What a call to [`Tracker::tick`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Set when a periodic save was attempted
    pub saved: Option<bool>,
    /// Set when statistics were logged
    pub stats: Option<ApmSummary>,
}

/// Owner of the event store and its persistence schedule.
pub struct Tracker {
    store: EventStore,
    data_file: PathBuf,
    save_interval: i64,
    stats_interval: i64,
    last_save: Option<Timestamp>,
    last_stats: Option<Timestamp>,
    session: SharedSessionStats,
}

impl Tracker {
    /// Create a tracker with an empty store sized from `config`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store: EventStore::new(config.store_capacity()?),
            data_file: config.data_file.clone(),
            save_interval: interval_secs(config.save_interval),
            stats_interval: interval_secs(config.stats_interval),
            last_save: None,
            last_stats: None,
            session: Arc::new(SessionStats::new()),
        })
    }

    /// Create a tracker and restore any previously saved history.
    ///
    /// A missing data file is normal on first run. An unreadable or corrupt
    /// file is logged and the tracker starts empty.
    pub fn open(config: &Config) -> Result<Self, ConfigError> {
        let mut tracker = Self::new(config)?;

        match tracker.restore() {
            Ok(0) => info!(path = ?tracker.data_file, "No previous activity data"),
            Ok(count) => info!(count, path = ?tracker.data_file, "Loaded events from data file"),
            Err(e) => warn!(path = ?tracker.data_file, "Ignoring data file: {e}"),
        }

        Ok(tracker)
    }

    /// Replace the store contents with the data file.
    ///
    /// On error the store is left as it was.
    pub fn restore(&mut self) -> Result<usize, PersistError> {
        codec::restore(&mut self.store, &self.data_file)
    }

    /// Record one detected action.
    pub fn record(&mut self, event: &ActivityEvent) {
        self.store.record_event(event.unix_seconds());
        self.session.record_activity(event.kind);
    }

    /// Run whatever periodic work is due at `now`.
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();

        if is_due(&mut self.last_save, now, self.save_interval) {
            report.saved = Some(self.save().is_ok());
        }

        if is_due(&mut self.last_stats, now, self.stats_interval) {
            let summary = self.summary(now);
            info!(
                "APM - 1h: {:.2}, 24h: {:.2}, 7d: {:.2}",
                summary.last_hour, summary.last_day, summary.last_7_days
            );
            report.stats = Some(summary);
        }

        report
    }

    /// Write the store to the data file now.
    pub fn save(&self) -> Result<SaveOutcome, PersistError> {
        let result = codec::save(&self.store, &self.data_file);

        match &result {
            Ok(SaveOutcome::Written(count)) => {
                debug!(count, path = ?self.data_file, "Saved activity data");
                self.session.record_save(true);
            }
            Ok(SaveOutcome::SkippedEmpty) => debug!("Nothing to save"),
            Err(e) => {
                error!(path = ?self.data_file, "Cannot save activity data: {e}");
                self.session.record_save(false);
            }
        }

        result
    }

    /// Final save before the process exits.
    pub fn shutdown(self) -> Result<SaveOutcome, PersistError> {
        let result = self.save();
        if let Ok(outcome) = &result {
            info!(?outcome, "Tracker stopped");
        }
        result
    }

    /// Drop all history, on disk and then in memory.
    ///
    /// If the data file cannot be deleted the store is left untouched.
    pub fn clear(&mut self) -> Result<bool, PersistError> {
        let removed = codec::remove(&self.data_file)?;
        self.store.clear();
        Ok(removed)
    }

    /// Actions per minute over the last `window_minutes` ending at `now`.
    pub fn compute_apm(&self, window_minutes: u32, now: Timestamp) -> Result<f64, RateError> {
        compute_apm(&self.store, window_minutes, now)
    }

    /// APM for all standard windows.
    pub fn summary(&self, now: Timestamp) -> ApmSummary {
        ApmSummary::compute(&self.store, now)
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn session(&self) -> SharedSessionStats {
        self.session.clone()
    }
}

fn interval_secs(interval: Duration) -> i64 {
    i64::try_from(interval.as_secs()).unwrap_or(i64::MAX).max(1)
}

/// True when `interval` seconds have passed since `last`. The first call
/// only starts the clock. A clock that jumped backwards restarts it.
fn is_due(last: &mut Option<Timestamp>, now: Timestamp, interval: i64) -> bool {
    match *last {
        None => {
            *last = Some(now);
            false
        }
        Some(prev) if now < prev => {
            *last = Some(now);
            false
        }
        Some(prev) if now - prev >= interval => {
            *last = Some(now);
            true
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ActivityKind;
    use chrono::DateTime;

    const T0: Timestamp = 1_700_000_000;

    fn config(dir: &Path) -> Config {
        Config {
            capacity: 100,
            data_file: dir.join("apm_data.bin"),
            save_interval: Duration::from_secs(300),
            stats_interval: Duration::from_secs(3600),
            ..Config::default()
        }
    }

    fn event(ts: Timestamp, kind: ActivityKind) -> ActivityEvent {
        ActivityEvent::at(DateTime::from_timestamp(ts, 0).unwrap(), kind)
    }

    #[test]
    fn test_is_due() {
        let mut last = None;
        assert!(!is_due(&mut last, 100, 10));
        assert!(!is_due(&mut last, 105, 10));
        assert!(is_due(&mut last, 110, 10));
        assert!(!is_due(&mut last, 115, 10));
        // Clock moved backwards.
        assert!(!is_due(&mut last, 50, 10));
        assert!(is_due(&mut last, 60, 10));
    }

    #[test]
    fn test_record_counts_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new(&config(dir.path())).unwrap();

        tracker.record(&event(T0, ActivityKind::KeyPress));
        tracker.record(&event(T0 + 1, ActivityKind::MouseClick));
        tracker.record(&event(T0 + 2, ActivityKind::KeyPress));

        assert_eq!(tracker.store().len(), 3);
        let snap = tracker.session().snapshot();
        assert_eq!(snap.key_presses, 2);
        assert_eq!(snap.mouse_clicks, 1);
        assert_eq!(tracker.compute_apm(1, T0 + 2).unwrap(), 3.0);
    }

    #[test]
    fn test_periodic_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new(&config(dir.path())).unwrap();
        tracker.record(&event(T0, ActivityKind::KeyPress));

        assert_eq!(tracker.tick(T0).saved, None);
        assert!(!tracker.data_file().exists());

        assert_eq!(tracker.tick(T0 + 299).saved, None);
        assert_eq!(tracker.tick(T0 + 300).saved, Some(true));
        assert!(tracker.data_file().exists());
        assert_eq!(tracker.session().snapshot().saves_completed, 1);
    }

    #[test]
    fn test_periodic_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new(&config(dir.path())).unwrap();
        for i in 0..60 {
            tracker.record(&event(T0 + 3600 - i, ActivityKind::KeyPress));
        }

        assert!(tracker.tick(T0).stats.is_none());
        let stats = tracker.tick(T0 + 3600).stats.unwrap();
        assert_eq!(stats.total_events, 60);
        assert_eq!(stats.last_hour, 1.0);
    }

    #[test]
    fn test_shutdown_then_open_restores() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let mut tracker = Tracker::open(&cfg).unwrap();
        assert!(tracker.store().is_empty());
        for i in 0..5 {
            tracker.record(&event(T0 + i, ActivityKind::KeyPress));
        }
        assert_eq!(tracker.shutdown().unwrap(), SaveOutcome::Written(5));

        let reopened = Tracker::open(&cfg).unwrap();
        let ts: Vec<_> = reopened.store().chronological().map(|r| r.timestamp).collect();
        assert_eq!(ts, (T0..T0 + 5).collect::<Vec<_>>());
    }

    #[test]
    fn test_failed_save_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let cfg = Config {
            data_file: blocker.join("apm_data.bin"),
            ..config(dir.path())
        };
        let mut tracker = Tracker::new(&cfg).unwrap();
        tracker.record(&event(T0, ActivityKind::KeyPress));

        assert!(matches!(tracker.save(), Err(PersistError::Io(_))));
        assert_eq!(tracker.session().snapshot().saves_failed, 1);
    }

    #[test]
    fn test_corrupt_file_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        std::fs::write(&cfg.data_file, [0u8; 32]).unwrap();

        let mut tracker = Tracker::open(&cfg).unwrap();
        assert!(tracker.store().is_empty());

        tracker.record(&event(T0, ActivityKind::KeyPress));
        assert!(tracker.restore().is_err());
        assert_eq!(tracker.store().len(), 1);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new(&config(dir.path())).unwrap();
        tracker.record(&event(T0, ActivityKind::KeyPress));
        tracker.save().unwrap();

        assert!(tracker.clear().unwrap());
        assert!(tracker.store().is_empty());
        assert!(!tracker.data_file().exists());
        assert!(!tracker.clear().unwrap());
    }

    #[test]
    fn test_clear_failure_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        // A directory cannot be removed as a file.
        std::fs::create_dir(&cfg.data_file).unwrap();

        let mut tracker = Tracker::new(&cfg).unwrap();
        tracker.record(&event(T0, ActivityKind::KeyPress));

        assert!(matches!(tracker.clear(), Err(PersistError::Io(_))));
        assert_eq!(tracker.store().len(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = Config {
            capacity: 0,
            ..Config::default()
        };
        assert!(Tracker::new(&cfg).is_err());
    }
}

//! Actions-per-minute over trailing windows.
//!
//! APM is the number of records with `timestamp >= now - window` divided by
//! the window length in minutes. Every call is a linear scan of the store;
//! the store is bounded so the cost is bounded too.

use crate::core::store::{ActivityRecord, EventStore, Timestamp};
use serde::{Deserialize, Serialize};

/// Compute actions per minute over the last `window_minutes` ending at `now`.
///
/// Returns `0.0` for an empty store. A zero-length window is rejected.
pub fn compute_apm(
    store: &EventStore,
    window_minutes: u32,
    now: Timestamp,
) -> Result<f64, RateError> {
    if window_minutes == 0 {
        return Err(RateError::InvalidWindow);
    }

    let cutoff = now.saturating_sub(i64::from(window_minutes) * 60);
    let count = store.chronological().filter(|r| r.timestamp >= cutoff).count();

    Ok(count as f64 / f64::from(window_minutes))
}

/// The standard reporting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApmWindow {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
    SevenDays,
}

const WINDOW_COUNT: usize = 6;

impl ApmWindow {
    pub const ALL: [ApmWindow; WINDOW_COUNT] = [
        ApmWindow::OneMinute,
        ApmWindow::FiveMinutes,
        ApmWindow::FifteenMinutes,
        ApmWindow::OneHour,
        ApmWindow::OneDay,
        ApmWindow::SevenDays,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            ApmWindow::OneMinute => 1,
            ApmWindow::FiveMinutes => 5,
            ApmWindow::FifteenMinutes => 15,
            ApmWindow::OneHour => 60,
            ApmWindow::OneDay => 24 * 60,
            ApmWindow::SevenDays => 7 * 24 * 60,
        }
    }

    /// Human label, e.g. "Last 5 minutes".
    pub fn label(self) -> &'static str {
        match self {
            ApmWindow::OneMinute => "Last 1 minute",
            ApmWindow::FiveMinutes => "Last 5 minutes",
            ApmWindow::FifteenMinutes => "Last 15 minutes",
            ApmWindow::OneHour => "Last hour",
            ApmWindow::OneDay => "Last 24 hours",
            ApmWindow::SevenDays => "Last 7 days",
        }
    }
}

/// APM for every standard window at one reference time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApmSummary {
    pub total_events: usize,
    pub last_minute: f64,
    pub last_5_minutes: f64,
    pub last_15_minutes: f64,
    pub last_hour: f64,
    pub last_day: f64,
    pub last_7_days: f64,
}

impl ApmSummary {
    /// Compute all windows in a single pass over the store.
    pub fn compute(store: &EventStore, now: Timestamp) -> Self {
        Self::from_records(store.chronological(), now)
    }

    pub fn from_records<I>(records: I, now: Timestamp) -> Self
    where
        I: IntoIterator<Item = ActivityRecord>,
    {
        let mut counts = [0usize; WINDOW_COUNT];
        let mut total_events = 0;

        for record in records {
            total_events += 1;
            let age = now.saturating_sub(record.timestamp);
            for (count, window) in counts.iter_mut().zip(ApmWindow::ALL) {
                if age <= i64::from(window.minutes()) * 60 {
                    *count += 1;
                }
            }
        }

        let rate = |i: usize| counts[i] as f64 / f64::from(ApmWindow::ALL[i].minutes());

        Self {
            total_events,
            last_minute: rate(0),
            last_5_minutes: rate(1),
            last_15_minutes: rate(2),
            last_hour: rate(3),
            last_day: rate(4),
            last_7_days: rate(5),
        }
    }

    pub fn get(&self, window: ApmWindow) -> f64 {
        match window {
            ApmWindow::OneMinute => self.last_minute,
            ApmWindow::FiveMinutes => self.last_5_minutes,
            ApmWindow::FifteenMinutes => self.last_15_minutes,
            ApmWindow::OneHour => self.last_hour,
            ApmWindow::OneDay => self.last_day,
            ApmWindow::SevenDays => self.last_7_days,
        }
    }

    /// Multi-line report in the format the `stats` command prints.
    pub fn report(&self) -> String {
        let mut out = String::from("Actions Per Minute (APM) Statistics:\n");
        out.push_str("--------------------------------\n");
        for window in ApmWindow::ALL {
            let label = format!("{}:", window.label());
            out.push_str(&format!("{label:<18}{:.2} APM\n", self.get(window)));
        }
        out
    }
}

/// Errors from rate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateError {
    /// The window must be at least one minute long
    InvalidWindow,
}

impl std::fmt::Display for RateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateError::InvalidWindow => write!(f, "APM window must be at least one minute"),
        }
    }
}

impl std::error::Error for RateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    const NOW: Timestamp = 1_609_459_200; // 2021-01-01 00:00:00 UTC

    fn store_with(timestamps: impl IntoIterator<Item = Timestamp>) -> EventStore {
        let mut store = EventStore::new(NonZeroUsize::new(1_000).unwrap());
        for t in timestamps {
            store.record_event(t);
        }
        store
    }

    #[test]
    fn test_one_event_per_second_for_a_minute() {
        let store = store_with((0..60).map(|i| NOW - i));
        assert_eq!(compute_apm(&store, 1, NOW).unwrap(), 60.0);
    }

    #[test]
    fn test_one_event_per_minute_for_an_hour() {
        let store = store_with((0..60).map(|i| NOW - i * 60));
        assert_eq!(compute_apm(&store, 60, NOW).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_store_is_zero() {
        let store = store_with([]);
        for minutes in [1, 5, 60, 10_080] {
            assert_eq!(compute_apm(&store, minutes, NOW).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        let store = store_with([NOW]);
        assert_eq!(compute_apm(&store, 0, NOW), Err(RateError::InvalidWindow));
    }

    #[test]
    fn test_lower_bound_is_inclusive() {
        let store = store_with([NOW - 60, NOW - 61]);
        assert_eq!(compute_apm(&store, 1, NOW).unwrap(), 1.0);
    }

    #[test]
    fn test_fractional_rate() {
        let store = store_with([NOW - 10, NOW - 20, NOW - 30]);
        let apm = compute_apm(&store, 5, NOW).unwrap();
        assert!((apm - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_counts_after_wraparound() {
        let mut store = EventStore::new(NonZeroUsize::new(10).unwrap());
        // 15 events, the first five get overwritten.
        for i in 0..15 {
            store.record_event(NOW - 100 + i);
        }
        // Retained: NOW-95 ..= NOW-86, all within two minutes.
        assert_eq!(compute_apm(&store, 2, NOW).unwrap(), 5.0);
    }

    #[test]
    fn test_summary_matches_individual_queries() {
        let store = store_with((0..500).map(|i| NOW - i * 37));
        let summary = ApmSummary::compute(&store, NOW);

        assert_eq!(summary.total_events, 500);
        for window in ApmWindow::ALL {
            let expected = compute_apm(&store, window.minutes(), NOW).unwrap();
            assert_eq!(summary.get(window), expected, "{window:?}");
        }
    }

    #[test]
    fn test_report_format() {
        let store = store_with((0..60).map(|i| NOW - i));
        let report = ApmSummary::compute(&store, NOW).report();

        assert!(report.contains("Last 1 minute:    60.00 APM"));
        assert!(report.contains("Last hour:        1.00 APM"));
        assert!(report.contains("Last 7 days:"));
    }
}

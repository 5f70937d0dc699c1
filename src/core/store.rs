//! Fixed-capacity ring buffer of activity timestamps.
//!
//! The store keeps at most `capacity` records. Once full, every new record
//! overwrites the logically oldest one. Callers never see physical slots; all
//! reads go through [`EventStore::chronological`], which yields records
//! oldest-to-newest regardless of where the write cursor currently sits.

use serde::{Deserialize, Serialize};
use std::iter::{Chain, Copied};
use std::num::NonZeroUsize;
use std::slice::Iter;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

/// Default capacity: one slot per second for seven days.
pub const DEFAULT_CAPACITY: usize = 7 * 24 * 60 * 60;

/// One recorded input action.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ActivityRecord {
    /// When the action happened
    pub timestamp: Timestamp,
}

impl ActivityRecord {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }
}

/// Bounded in-memory history of activity records.
#[derive(Debug, Clone)]
pub struct EventStore {
    /// Backing slots. Grows up to `capacity`, then is overwritten in place.
    records: Vec<ActivityRecord>,
    capacity: usize,
    /// Slot the next record goes into. Equals `records.len()` until the
    /// store fills, after which it points at the oldest record.
    cursor: usize,
}

impl EventStore {
    /// Create an empty store holding at most `capacity` records.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            records: Vec::new(),
            capacity: capacity.get(),
            cursor: 0,
        }
    }

    /// Append one record, overwriting the oldest if the store is full.
    pub fn record_event(&mut self, now: Timestamp) {
        let record = ActivityRecord::new(now);

        if self.records.len() < self.capacity {
            self.records.push(record);
        } else {
            self.records[self.cursor] = record;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Records from oldest to newest.
    ///
    /// The returned view borrows the store and can be cloned to restart the
    /// walk from the beginning.
    pub fn chronological(&self) -> ChronologicalView<'_> {
        // Before the first wrap the cursor sits at `records.len()`, so the
        // leading half is empty and the walk is just the slots in order.
        let (newer, older) = self.records.split_at(self.cursor);
        ChronologicalView {
            inner: older.iter().chain(newer.iter()).copied(),
        }
    }

    /// Replace the whole contents with `records`, given oldest first.
    ///
    /// When more than `capacity` records are supplied only the most recent
    /// `capacity` are kept.
    pub fn replace_all<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ActivityRecord>,
    {
        let mut incoming: Vec<ActivityRecord> = records.into_iter().collect();
        if incoming.len() > self.capacity {
            let excess = incoming.len() - self.capacity;
            incoming.drain(..excess);
        }

        self.cursor = incoming.len() % self.capacity;
        self.records = incoming;
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = 0;
    }

    /// Maximum number of records the store can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Oldest-to-newest iterator over an [`EventStore`].
#[derive(Debug, Clone)]
pub struct ChronologicalView<'a> {
    inner: Copied<Chain<Iter<'a, ActivityRecord>, Iter<'a, ActivityRecord>>>,
}

impl Iterator for ChronologicalView<'_> {
    type Item = ActivityRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for ChronologicalView<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for ChronologicalView<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> EventStore {
        EventStore::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn timestamps(store: &EventStore) -> Vec<Timestamp> {
        store.chronological().map(|r| r.timestamp).collect()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = store(4);
        assert_eq!(store.len(), 0);
        assert_eq!(store.capacity(), 4);
        assert!(store.is_empty());
        assert_eq!(store.chronological().count(), 0);
    }

    #[test]
    fn test_default_capacity_is_seven_days() {
        assert_eq!(EventStore::default().capacity(), 604_800);
    }

    #[test]
    fn test_record_before_full() {
        let mut store = store(5);
        for t in 10..13 {
            store.record_event(t);
        }

        assert_eq!(store.len(), 3);
        assert_eq!(timestamps(&store), vec![10, 11, 12]);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut store = store(7);
        for t in 0..100 {
            store.record_event(t);
            assert!(store.len() <= store.capacity());
        }
        assert_eq!(store.len(), 7);
    }

    #[test]
    fn test_wraparound_keeps_newest_in_order() {
        let mut store = store(5);
        for t in 0..8 {
            store.record_event(t);
        }

        assert_eq!(timestamps(&store), vec![3, 4, 5, 6, 7]);
        assert_eq!(store.chronological().next_back(), Some(ActivityRecord::new(7)));
    }

    #[test]
    fn test_wraparound_at_every_offset() {
        let capacity = 4;
        for extra in 0..=(2 * capacity) {
            let mut store = store(capacity);
            let total = (capacity + extra) as i64;
            for t in 0..total {
                store.record_event(t);
            }

            let expected: Vec<i64> = (total - capacity as i64..total).collect();
            assert_eq!(timestamps(&store), expected, "extra = {extra}");
        }
    }

    #[test]
    fn test_capacity_one() {
        let mut store = store(1);
        store.record_event(1);
        store.record_event(2);
        store.record_event(3);
        assert_eq!(timestamps(&store), vec![3]);
    }

    #[test]
    fn test_view_is_restartable() {
        let mut store = store(3);
        for t in 0..5 {
            store.record_event(t);
        }

        let view = store.chronological();
        let first: Vec<_> = view.clone().collect();
        let second: Vec<_> = view.collect();
        assert_eq!(first, second);
        assert_eq!(store.chronological().len(), 3);
    }

    #[test]
    fn test_replace_all_under_capacity() {
        let mut store = store(5);
        store.replace_all([1, 2, 3].map(ActivityRecord::new));

        assert_eq!(store.len(), 3);
        assert_eq!(timestamps(&store), vec![1, 2, 3]);

        // Subsequent writes continue after the loaded records.
        store.record_event(4);
        assert_eq!(timestamps(&store), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_replace_all_keeps_most_recent() {
        let mut store = store(3);
        store.replace_all((1..=6).map(ActivityRecord::new));

        assert_eq!(store.len(), store.capacity());
        assert_eq!(timestamps(&store), vec![4, 5, 6]);

        store.record_event(7);
        assert_eq!(timestamps(&store), vec![5, 6, 7]);
    }

    #[test]
    fn test_replace_all_exactly_full() {
        let mut store = store(3);
        store.replace_all((1..=3).map(ActivityRecord::new));
        store.record_event(4);
        assert_eq!(timestamps(&store), vec![2, 3, 4]);
    }

    #[test]
    fn test_replace_all_discards_previous_contents() {
        let mut store = store(4);
        for t in 0..9 {
            store.record_event(t);
        }

        store.replace_all([100].map(ActivityRecord::new));
        assert_eq!(timestamps(&store), vec![100]);
    }

    #[test]
    fn test_clear() {
        let mut store = store(2);
        store.record_event(1);
        store.record_event(2);
        store.record_event(3);
        store.clear();

        assert!(store.is_empty());
        store.record_event(9);
        assert_eq!(timestamps(&store), vec![9]);
    }
}

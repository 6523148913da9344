//! Progressive migration of entries from the previous table into the current
//! one.
//!
//! A resize never rehashes the whole map at once. Instead, the current table is
//! replaced by one of twice the capacity and kept around as the previous table.
//! Then every map operation moves up to `rehash_step` buckets of the previous
//! table, starting from a cursor at index 0, into the current table. When the
//! last bucket has been moved the previous table is dropped.
//!
//! While a resize is in flight a key lives in exactly one of the two tables:
//! entries are only ever *moved* from a previous bucket to a current bucket
//! (never copied), and inserts check both tables before adding a new entry.
//! All of this happens while the caller holds the map's coordination lock
//! exclusively, so no reader can observe a bucket whose chain has been detached
//! but not yet redistributed.

use super::table::Table;
use crate::hash::KeyHasher;

use std::mem;

/// The tables of a map and the progress of the resize in flight, if any.
/// Guarded by the map's coordination lock.
pub(crate) struct Tables<K, V> {
    pub(crate) current: Table<K, V>,
    pub(crate) previous: Option<Table<K, V>>,
    // The index of the next previous-table bucket to migrate.
    cursor: usize,
    // The number of previous-table buckets not migrated yet.
    remaining: usize,
}

/// What a migration step did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StepOutcome {
    pub(crate) migrated_buckets: usize,
    pub(crate) migrated_entries: usize,
    /// `true` if this step retired the previous table.
    pub(crate) completed: bool,
}

impl<K, V> Tables<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            current: Table::with_capacity(capacity),
            previous: None,
            cursor: 0,
            remaining: 0,
        }
    }

    #[inline]
    pub(crate) fn is_resizing(&self) -> bool {
        self.previous.is_some()
    }

    /// Replaces the current table with an empty one of twice its capacity and
    /// turns the old one into the previous table. Returns the new capacity, or
    /// `None` if a resize is already in flight or the capacity cannot grow.
    pub(crate) fn start_resize(&mut self) -> Option<usize> {
        if self.is_resizing() {
            return None;
        }

        let new_capacity = self.current.capacity().checked_mul(2)?;
        let old = mem::replace(&mut self.current, Table::with_capacity(new_capacity));
        self.cursor = 0;
        self.remaining = old.capacity();
        self.previous = Some(old);

        Some(new_capacity)
    }

    /// Moves up to `step` buckets of the previous table into the current table.
    /// Does nothing if no resize is in flight.
    pub(crate) fn migrate_step<H>(&mut self, step: usize, hasher: &H) -> StepOutcome
    where
        H: KeyHasher<K>,
    {
        let mut outcome = StepOutcome::default();

        let previous = match self.previous.as_mut() {
            Some(previous) => previous,
            None => return outcome,
        };

        let end = self.cursor.saturating_add(step).min(previous.capacity());
        while self.cursor < end {
            let chain = previous.detach(self.cursor);
            outcome.migrated_entries += chain.len();

            for entry in chain {
                let hash = hasher.hash_key(&entry.key);
                self.current.push(hash, entry);
            }

            self.cursor += 1;
            self.remaining -= 1;
            outcome.migrated_buckets += 1;
        }

        if self.remaining == 0 || self.cursor >= previous.capacity() {
            self.retire_previous();
            outcome.completed = true;
        }

        outcome
    }

    fn retire_previous(&mut self) {
        self.previous = None;
        self.cursor = 0;
        self.remaining = 0;
    }
}

#[cfg(test)]
impl<K: Eq, V> Tables<K, V> {
    /// Checks that every entry sits in the bucket its digest maps to, that the
    /// previous table holds nothing below the cursor, and that no key is
    /// reachable twice. Returns the number of entries.
    pub(crate) fn check_invariants<H: KeyHasher<K>>(&mut self, hasher: &H) -> usize {
        let cursor = self.cursor;
        let mut keys = Vec::new();

        let current_capacity = self.current.capacity();
        assert!(current_capacity.is_power_of_two() && current_capacity >= crate::MIN_CAPACITY);
        for (index, entry) in self.current.entries() {
            let mask = current_capacity as u64 - 1;
            assert_eq!(index as u64, hasher.hash_key(&entry.key) & mask);
            keys.push(&entry.key);
        }

        if let Some(previous) = self.previous.as_mut() {
            let capacity = previous.capacity();
            assert_eq!(capacity * 2, current_capacity);
            assert_eq!(self.remaining, capacity - cursor);
            for (index, entry) in previous.entries() {
                assert!(index >= cursor, "bucket {index} was migrated but is not empty");
                assert_eq!(index as u64, hasher.hash_key(&entry.key) & (capacity as u64 - 1));
                keys.push(&entry.key);
            }
        } else {
            assert_eq!((self.cursor, self.remaining), (0, 0));
        }

        for (i, key) in keys.iter().enumerate() {
            assert!(
                keys[i + 1..].iter().all(|other| other != key),
                "a key is reachable twice"
            );
        }

        keys.len()
    }
}

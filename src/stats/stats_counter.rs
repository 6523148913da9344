use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::{atomic::AtomicCell, CachePadded};

use super::MapStats;

/// Counters behind [`MapStats`].
///
/// Lookup counters are striped across threads as readers run concurrently with
/// each other. Resize and migration counters are only updated by the holder of
/// the exclusive coordination lock, so a single cache line is enough for them.
pub(crate) struct StatsCounter {
    request_counters: Box<[CachePadded<RequestCounter>]>,
    resize_counter: CachePadded<ResizeCounter>,
}

#[derive(Default)]
struct RequestCounter {
    hit_count: AtomicCell<u64>,
    miss_count: AtomicCell<u64>,
}

#[derive(Default)]
struct ResizeCounter {
    resize_count: AtomicCell<u64>,
    completed_resize_count: AtomicCell<u64>,
    migrated_bucket_count: AtomicCell<u64>,
    migrated_entry_count: AtomicCell<u64>,
}

impl Default for StatsCounter {
    fn default() -> Self {
        let num_counters = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            * 2;

        let request_counters = std::iter::repeat_with(Default::default)
            .take(num_counters)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            request_counters,
            resize_counter: Default::default(),
        }
    }
}

impl StatsCounter {
    pub(crate) fn record_lookup(&self, hit: bool) {
        let counter = self.request_counter();
        if hit {
            saturating_add(&counter.hit_count, 1);
        } else {
            saturating_add(&counter.miss_count, 1);
        }
    }

    pub(crate) fn record_resize_started(&self) {
        saturating_add(&self.resize_counter.resize_count, 1);
    }

    pub(crate) fn record_resize_completed(&self) {
        saturating_add(&self.resize_counter.completed_resize_count, 1);
    }

    pub(crate) fn record_migration(&self, buckets: usize, entries: usize) {
        let counter = &self.resize_counter;
        saturating_add(&counter.migrated_bucket_count, buckets as u64);
        saturating_add(&counter.migrated_entry_count, entries as u64);
    }

    pub(crate) fn snapshot(&self) -> MapStats {
        let hit_count = self.sum_counters(|c| c.hit_count.load());
        let miss_count = self.sum_counters(|c| c.miss_count.load());
        let counter = &self.resize_counter;

        let mut stats = MapStats::default();
        stats
            .set_req_counts(hit_count, miss_count)
            .set_resize_counts(
                counter.resize_count.load(),
                counter.completed_resize_count.load(),
            )
            .set_migration_counts(
                counter.migrated_bucket_count.load(),
                counter.migrated_entry_count.load(),
            );
        stats
    }

    fn request_counter(&self) -> &RequestCounter {
        thread_local! { static INDEX: usize = next_index() };
        INDEX.with(|i| &self.request_counters[*i % self.request_counters.len()])
    }

    fn sum_counters(&self, mut selector: impl FnMut(&RequestCounter) -> u64) -> u64 {
        self.request_counters
            .iter()
            .fold(0, |acc, counter| acc.saturating_add(selector(counter)))
    }
}

fn saturating_add(counter: &AtomicCell<u64>, value: u64) {
    let mut v0 = counter.load();
    loop {
        let v1 = v0.saturating_add(value);
        match counter.compare_exchange(v0, v1) {
            Ok(_) => break,
            Err(v2) => v0 = v2,
        }
    }
}

static NEXT_INDEX: AtomicUsize = AtomicUsize::new(0);

fn next_index() -> usize {
    NEXT_INDEX.fetch_add(1, Ordering::Relaxed)
}

//! Provides a snapshot of the statistics of a map.

mod stats_counter;

pub(crate) use stats_counter::StatsCounter;

/// Statistics of a [`ConcurrentMap`][map-struct], returned by its
/// [`stats`][stats-method] method.
///
/// Lookups (`get`, `get_with` and `contains_key`) count as hits or misses.
/// Resize counters show how far the progressive migration has come: a resize
/// is counted when the larger table is allocated, and counted as completed when
/// the last bucket of the previous table has been migrated.
///
/// [map-struct]: ../struct.ConcurrentMap.html
/// [stats-method]: ../struct.ConcurrentMap.html#method.stats
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
    hit_count: u64,
    miss_count: u64,
    resize_count: u64,
    completed_resize_count: u64,
    migrated_bucket_count: u64,
    migrated_entry_count: u64,
}

impl MapStats {
    pub(crate) fn set_req_counts(&mut self, hit_count: u64, miss_count: u64) -> &mut Self {
        self.hit_count = hit_count;
        self.miss_count = miss_count;
        self
    }

    pub(crate) fn set_resize_counts(
        &mut self,
        resize_count: u64,
        completed_resize_count: u64,
    ) -> &mut Self {
        self.resize_count = resize_count;
        self.completed_resize_count = completed_resize_count;
        self
    }

    pub(crate) fn set_migration_counts(
        &mut self,
        migrated_bucket_count: u64,
        migrated_entry_count: u64,
    ) -> &mut Self {
        self.migrated_bucket_count = migrated_bucket_count;
        self.migrated_entry_count = migrated_entry_count;
        self
    }

    pub fn request_count(&self) -> u64 {
        self.hit_count.saturating_add(self.miss_count)
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn hit_rate(&self) -> f64 {
        let req_count = self.request_count();
        if req_count == 0 {
            1.0
        } else {
            self.hit_count as f64 / req_count as f64
        }
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    pub fn miss_rate(&self) -> f64 {
        let req_count = self.request_count();
        if req_count == 0 {
            0.0
        } else {
            self.miss_count as f64 / req_count as f64
        }
    }

    /// Returns the number of resizes started.
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    /// Returns the number of resizes whose migration has finished.
    pub fn completed_resize_count(&self) -> u64 {
        self.completed_resize_count
    }

    pub fn migrated_bucket_count(&self) -> u64 {
        self.migrated_bucket_count
    }

    pub fn migrated_entry_count(&self) -> u64 {
        self.migrated_entry_count
    }
}

/// The smallest number of buckets a table can have. Every table capacity is a
/// power of two no smaller than this.
pub const MIN_CAPACITY: usize = 16;

/// The ratio of live keys to buckets above which the next mutating operation
/// starts a resize.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.7;

/// The maximum number of previous-table buckets moved into the current table by
/// a single operation while a resize is in flight.
pub const DEFAULT_REHASH_STEP: usize = 10;

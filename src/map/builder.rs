use super::{ConcurrentMap, MapConfig};
use crate::{
    common::{
        self,
        constants::{DEFAULT_LOAD_FACTOR, DEFAULT_REHASH_STEP, MIN_CAPACITY},
    },
    hash::DefaultKeyHasher,
    ConfigError,
};

use std::marker::PhantomData;

/// Builds a [`ConcurrentMap`][map-struct] with various configuration knobs.
///
/// [map-struct]: ./struct.ConcurrentMap.html
///
/// # Examples
///
/// ```rust
/// use stepmap::ConcurrentMap;
///
/// let map = ConcurrentMap::builder()
///     // Start with 1,024 buckets.
///     .initial_capacity(1_000)
///     // Grow when there are more than 0.5 keys per bucket.
///     .load_factor(0.5)
///     // Move up to 32 buckets per operation while growing.
///     .rehash_step(32)
///     // A name to tell maps apart in log records.
///     .name("sessions")
///     // Hash the keys with a custom closure.
///     .hasher(|id: &u64| id.wrapping_mul(0x9e37_79b9_7f4a_7c15))
///     .build();
///
/// map.insert(1u64, "one");
/// assert_eq!(map.capacity(), 1024);
/// assert_eq!(map.name(), Some("sessions"));
/// ```
///
#[must_use]
pub struct MapBuilder<K, V, H = DefaultKeyHasher> {
    initial_capacity: usize,
    load_factor: f64,
    rehash_step: usize,
    name: Option<String>,
    hasher: H,
    map_type: PhantomData<(K, V)>,
}

impl<K, V> Default for MapBuilder<K, V, DefaultKeyHasher> {
    fn default() -> Self {
        Self {
            initial_capacity: MIN_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            rehash_step: DEFAULT_REHASH_STEP,
            name: None,
            hasher: DefaultKeyHasher,
            map_type: PhantomData,
        }
    }
}

impl<K, V> MapBuilder<K, V, DefaultKeyHasher> {
    /// Construct a new `MapBuilder` with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, H> MapBuilder<K, V, H> {
    /// Sets the initial number of buckets. It is rounded up to a power of two of
    /// at least 16.
    pub fn initial_capacity(self, capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            ..self
        }
    }

    /// Sets the ratio of keys to buckets above which the map starts growing.
    /// Must be greater than `0.0` and not greater than `1.0`. Default: `0.7`.
    pub fn load_factor(self, load_factor: f64) -> Self {
        Self {
            load_factor,
            ..self
        }
    }

    /// Sets the maximum number of buckets a single operation migrates while the
    /// map is growing. Must be at least 1. Default: `10`.
    pub fn rehash_step(self, rehash_step: usize) -> Self {
        Self {
            rehash_step,
            ..self
        }
    }

    /// Sets the name of the map. The name prefixes the log records of the map
    /// when the `logging` feature is enabled.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the hasher of the map, replacing the
    /// [`DefaultKeyHasher`][default-hasher]. This is the only way to change the
    /// hasher; it is fixed for the lifetime of the built map.
    ///
    /// [default-hasher]: ./hash/struct.DefaultKeyHasher.html
    pub fn hasher<H2>(self, hasher: H2) -> MapBuilder<K, V, H2> {
        MapBuilder {
            initial_capacity: self.initial_capacity,
            load_factor: self.load_factor,
            rehash_step: self.rehash_step,
            name: self.name,
            hasher,
            map_type: PhantomData,
        }
    }

    /// Builds a `ConcurrentMap<K, V, H>`, or returns an error if the
    /// configuration is invalid.
    pub fn try_build(self) -> Result<ConcurrentMap<K, V, H>, ConfigError> {
        let load_factor = self.load_factor;
        if !(load_factor.is_finite() && load_factor > 0.0 && load_factor <= 1.0) {
            return Err(ConfigError::InvalidLoadFactor(load_factor));
        }
        if self.rehash_step == 0 {
            return Err(ConfigError::ZeroRehashStep);
        }
        let capacity = common::table_capacity(self.initial_capacity)
            .ok_or(ConfigError::CapacityOverflow(self.initial_capacity))?;

        let config = MapConfig {
            load_factor,
            rehash_step: self.rehash_step,
            name: self.name,
        };
        Ok(ConcurrentMap::with_everything(capacity, self.hasher, config))
    }

    /// Builds a `ConcurrentMap<K, V, H>`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See [`ConfigError`] for the cases.
    pub fn build(self) -> ConcurrentMap<K, V, H> {
        match self.try_build() {
            Ok(map) => map,
            Err(e) => panic!("{e}"),
        }
    }
}

pub(crate) mod builder;
pub(crate) mod migration;
pub(crate) mod table;

pub use self::builder::MapBuilder;

use self::{migration::Tables, table::Entry};
use crate::{
    hash::{DefaultKeyHasher, KeyHasher},
    stats::{MapStats, StatsCounter},
};

use std::{
    borrow::Borrow,
    fmt, mem,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crossbeam_utils::CachePadded;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) struct MapConfig {
    pub(crate) load_factor: f64,
    pub(crate) rehash_step: usize,
    pub(crate) name: Option<String>,
}

/// A thread-safe hash map that grows without stopping the world.
///
/// When the number of keys exceeds the load factor (default: `0.7`) times the
/// number of buckets, the next `insert` allocates a table of twice the capacity.
/// From then on, every operation (including `get`) moves up to
/// `rehash_step` (default: `10`) buckets of the old table into the new one,
/// until the old table is empty and dropped. No single operation ever rehashes
/// more than `rehash_step` buckets, so the latency of an operation is bounded
/// by the chain length and the step size, never by the size of the map.
///
/// While a resize is in flight, lookups consult the new table first and then
/// the old one, so a key is never invisible. A key is never stored in both
/// tables at once.
///
/// # Synchronization
///
/// The map is guarded by a reader-writer coordination lock. `insert`, `remove`
/// and `clear` take it exclusively and are linearized with each other. Lookups
/// take it in shared mode and run in parallel with each other, locking only
/// the bucket they read. A lookup that finds a resize in flight briefly takes
/// the lock exclusively to advance the migration, then downgrades it to shared
/// mode for the lookup itself. `len`, `capacity` and `is_resizing` read atomics
/// and never block.
///
/// # Hashing
///
/// By default, keys are hashed by the [`DefaultKeyHasher`], which supports text,
/// integer and boolean keys, and (with the `serde` feature) any serializable
/// key wrapped in [`Structured`][structured]. Other keys need a custom
/// [`KeyHasher`], set at construction time with
/// [`with_capacity_and_hasher`](#method.with_capacity_and_hasher) or
/// [`MapBuilder::hasher`].
///
/// The hasher must be a pure function of the key: if `k1 == k2` then
/// `hash_key(k1) == hash_key(k2)`. It is a logic error for a key to be modified
/// in such a way that its digest or its equality changes while it is in the
/// map. The behavior resulting from such a logic error is not specified, but
/// will not result in undefined behavior.
///
/// # Examples
///
/// ```rust
/// use stepmap::ConcurrentMap;
///
/// use std::{sync::Arc, thread};
///
/// let map = Arc::new(ConcurrentMap::with_capacity(4));
///
/// let writers: Vec<_> = (0..4u64)
///     .map(|t| {
///         let map = Arc::clone(&map);
///         thread::spawn(move || {
///             for i in 0..250 {
///                 map.insert(t * 1000 + i, format!("value-{i}"));
///             }
///         })
///     })
///     .collect();
/// writers.into_iter().for_each(|h| h.join().unwrap());
///
/// assert_eq!(map.len(), 1000);
/// assert_eq!(map.get(&3042), Some("value-42".to_string()));
/// assert!(map.capacity() >= 1024);
/// ```
///
/// [structured]: ./hash/struct.Structured.html
pub struct ConcurrentMap<K, V, H = DefaultKeyHasher> {
    tables: RwLock<Tables<K, V>>,
    len: CachePadded<AtomicUsize>,
    // Mirrors of the table state, written only by the holder of the exclusive
    // lock.
    capacity: AtomicUsize,
    resizing: AtomicBool,
    hasher: H,
    config: MapConfig,
    stats: StatsCounter,
}

impl<K, V> ConcurrentMap<K, V, DefaultKeyHasher> {
    /// Creates an empty map with 16 buckets and the default hasher.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty map with at least `capacity` buckets (rounded up to a
    /// power of two of at least 16) and the default hasher.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().initial_capacity(capacity).build()
    }

    /// Returns a [`MapBuilder`], which can build a `ConcurrentMap` with various
    /// configuration knobs.
    pub fn builder() -> MapBuilder<K, V, DefaultKeyHasher> {
        MapBuilder::default()
    }
}

impl<K, V> Default for ConcurrentMap<K, V, DefaultKeyHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> ConcurrentMap<K, V, H> {
    /// Creates an empty map with at least `capacity` buckets (rounded up to a
    /// power of two of at least 16), using `hasher` to hash the keys.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize`.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        MapBuilder::default()
            .initial_capacity(capacity)
            .hasher(hasher)
            .build()
    }

    pub(crate) fn with_everything(capacity: usize, hasher: H, config: MapConfig) -> Self {
        Self {
            tables: RwLock::new(Tables::with_capacity(capacity)),
            len: CachePadded::new(AtomicUsize::new(0)),
            capacity: AtomicUsize::new(capacity),
            resizing: AtomicBool::new(false),
            hasher,
            config,
            stats: StatsCounter::default(),
        }
    }

    /// Returns the number of keys in the map.
    ///
    /// Keys in the middle of a migration are counted exactly once.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if the map contains no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buckets of the current table. Always a power of two
    /// of at least 16.
    ///
    /// The capacity doubles as soon as a resize starts, before any entry has
    /// been migrated.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Returns `true` while entries are being migrated from the previous table.
    pub fn is_resizing(&self) -> bool {
        self.resizing.load(Ordering::Acquire)
    }

    /// Returns the name of the map, if one was given to the builder.
    pub fn name(&self) -> Option<&str> {
        self.config.name.as_deref()
    }

    /// Returns a snapshot of the statistics of the map.
    pub fn stats(&self) -> MapStats {
        self.stats.snapshot()
    }

    /// Removes all keys. A resize in flight is abandoned; the capacity of the
    /// current table is kept.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        let capacity = tables.current.capacity();
        let old = mem::replace(&mut *tables, Tables::with_capacity(capacity));
        self.len.store(0, Ordering::Release);
        self.resizing.store(false, Ordering::Release);
        drop(tables);

        // Drop the entries outside the lock.
        drop(old);
    }

    #[inline]
    fn hash<Q>(&self, key: &Q) -> u64
    where
        Q: ?Sized,
        H: KeyHasher<Q>,
    {
        <H as KeyHasher<Q>>::hash_key(&self.hasher, key)
    }
}

impl<K, V, H> ConcurrentMap<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    /// Returns a clone of the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the hasher
    /// must produce the same digest for the borrowed form, and [`Eq`] on the
    /// borrowed form *must* match that of the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: KeyHasher<Q>,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Returns the result of invoking `with_value` with a reference to the
    /// value corresponding to the key. `with_value` is called while the bucket
    /// lock is held in shared mode, so it should be quick.
    pub fn get_with<Q, F, T>(&self, key: &Q, with_value: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: KeyHasher<Q>,
        F: FnOnce(&V) -> T,
    {
        let hash = self.hash(key);
        let tables = self.read_tables();

        let result = match tables.current.find_with(hash, key, with_value) {
            Ok(found) => Some(found),
            Err(with_value) => tables
                .previous
                .as_ref()
                .and_then(|previous| previous.find_with(hash, key, with_value).ok()),
        };
        drop(tables);

        self.stats.record_lookup(result.is_some());
        result
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: KeyHasher<Q>,
    {
        self.get_with(key, |_| ()).is_some()
    }

    /// Inserts a key-value pair into the map, returning the value it replaced.
    ///
    /// If the map already had this key present, the value is updated in place
    /// and the length of the map is unchanged.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let hash = self.hash(&key);
        let mut tables = self.tables.write();

        if tables.is_resizing() {
            self.advance_migration(&mut tables);
        } else {
            self.maybe_start_resize(&mut tables);
        }

        if let Some(slot) = tables.current.value_mut(hash, &key) {
            return Some(mem::replace(slot, value));
        }
        if let Some(slot) = tables
            .previous
            .as_mut()
            .and_then(|previous| previous.value_mut(hash, &key))
        {
            return Some(mem::replace(slot, value));
        }

        tables.current.push(hash, Entry::new(key, value));
        self.len.fetch_add(1, Ordering::AcqRel);
        None
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// The key may be any borrowed form of the map's key type, but the hasher
    /// must produce the same digest for the borrowed form, and [`Eq`] on the
    /// borrowed form *must* match that of the key type.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: KeyHasher<Q>,
    {
        let hash = self.hash(key);
        let mut tables = self.tables.write();

        if tables.is_resizing() {
            self.advance_migration(&mut tables);
        }

        let removed = match tables.current.remove(hash, key) {
            Some(entry) => Some(entry),
            None => tables
                .previous
                .as_mut()
                .and_then(|previous| previous.remove(hash, key)),
        };
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        drop(tables);

        removed.map(|entry| entry.value)
    }

    // Takes the coordination lock in shared mode. If a resize is in flight,
    // takes it exclusively first to migrate one step.
    fn read_tables(&self) -> RwLockReadGuard<'_, Tables<K, V>> {
        let tables = self.tables.read();
        if !tables.is_resizing() {
            return tables;
        }
        drop(tables);

        let mut tables = self.tables.write();
        self.advance_migration(&mut tables);
        RwLockWriteGuard::downgrade(tables)
    }

    fn advance_migration(&self, tables: &mut Tables<K, V>) {
        let outcome = tables.migrate_step(self.config.rehash_step, &self.hasher);
        self.stats
            .record_migration(outcome.migrated_buckets, outcome.migrated_entries);

        #[cfg(feature = "logging")]
        if outcome.migrated_buckets > 0 {
            log::trace!(
                "{}Migrated {} buckets ({} entries) into the table of {} buckets",
                self.log_prefix(),
                outcome.migrated_buckets,
                outcome.migrated_entries,
                tables.current.capacity(),
            );
        }

        if outcome.completed {
            self.resizing.store(false, Ordering::Release);
            self.stats.record_resize_completed();

            #[cfg(feature = "logging")]
            log::debug!(
                "{}Finished resizing to {} buckets",
                self.log_prefix(),
                tables.current.capacity()
            );
        }
    }

    fn maybe_start_resize(&self, tables: &mut Tables<K, V>) {
        let len = self.len.load(Ordering::Acquire);
        let capacity = tables.current.capacity();
        if len as f64 / capacity as f64 <= self.config.load_factor {
            return;
        }

        if let Some(new_capacity) = tables.start_resize() {
            self.capacity.store(new_capacity, Ordering::Release);
            self.resizing.store(true, Ordering::Release);
            self.stats.record_resize_started();

            #[cfg(feature = "logging")]
            log::debug!(
                "{}Started resizing from {} to {} buckets ({} keys)",
                self.log_prefix(),
                capacity,
                new_capacity,
                len
            );
        }
    }

    #[cfg(feature = "logging")]
    fn log_prefix(&self) -> String {
        self.name()
            .map(|name| format!("[{name}] "))
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn check_invariants(&self) -> usize {
        let mut tables = self.tables.write();
        let count = tables.check_invariants(&self.hasher);
        assert_eq!(count, self.len());
        assert_eq!(tables.current.capacity(), self.capacity());
        assert_eq!(tables.is_resizing(), self.is_resizing());
        count
    }
}

impl<K, V, H> fmt::Debug for ConcurrentMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("name", &self.config.name)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("resizing", &self.is_resizing())
            .finish()
    }
}

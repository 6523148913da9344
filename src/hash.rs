//! Key hashing.
//!
//! A [`ConcurrentMap`][map-struct] turns every key into a 64-bit digest with a
//! [`KeyHasher`], and masks the digest with `capacity - 1` to select a bucket.
//! The hasher is chosen when the map is built and cannot be replaced
//! afterwards.
//!
//! Three kinds of hashers are provided:
//!
//! - [`DefaultKeyHasher`] hashes the keys that implement [`HashKey`] by their
//!   [`KeyShape`]: text by its UTF-8 bytes, integers by their big-endian byte
//!   representation, booleans to one of two fixed digests, and structured
//!   values by a serialized form of their content. The digests are
//!   deterministic across process runs.
//! - Any closure `Fn(&K) -> u64` is a `KeyHasher<K>`. This is the escape hatch
//!   for keys with no natural shape.
//! - [`BuildHasherAdapter`] lets any [`BuildHasher`] from the standard library or
//!   crates.io (such as `RandomState` or `ahash::RandomState`) hash keys that
//!   implement [`Hash`].
//!
//! A `KeyHasher` must be a pure, total function of the key: if `k1 == k2` then
//! `hash_key(k1) == hash_key(k2)`, for the whole lifetime of the map. Breaking
//! this is a logic error. The map will not panic or corrupt memory, but lookups
//! for the affected keys may miss and duplicate keys may be stored.
//!
//! [map-struct]: ../struct.ConcurrentMap.html

mod shape;
#[cfg(feature = "serde")]
mod structured;

pub use shape::{HashKey, KeyShape};
#[cfg(feature = "serde")]
pub use structured::Structured;

use std::hash::{BuildHasher, Hash, Hasher};

/// Computes the 64-bit digest a map uses to place a key of type `K`.
///
/// To look a key up by a borrowed form `Q` (for example, `&str` for a
/// `String` key), the hasher must also implement `KeyHasher<Q>` and produce
/// the same digest for both forms.
pub trait KeyHasher<K: ?Sized> {
    /// Returns the digest of `key`.
    fn hash_key(&self, key: &K) -> u64;
}

impl<K, F> KeyHasher<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> u64,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self(key)
    }
}

/// The default hasher of a `ConcurrentMap`. Dispatches on the [`KeyShape`] of
/// the key and digests it with XXH3.
///
/// `String` and `str` (and any other text key) produce the same digest, so
/// maps with `String` keys can be queried by `&str`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultKeyHasher;

impl<K> KeyHasher<K> for DefaultKeyHasher
where
    K: HashKey + ?Sized,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        key.shape().digest()
    }
}

/// Adapts a [`BuildHasher`] into a [`KeyHasher`] for keys implementing
/// [`Hash`].
///
/// Note that a randomly seeded `BuildHasher` produces different digests in
/// different processes. This is fine within one map, as the seed is fixed when
/// the adapter is created.
///
/// # Examples
///
/// ```rust
/// use stepmap::{hash::BuildHasherAdapter, ConcurrentMap};
/// use std::collections::hash_map::RandomState;
///
/// let map = ConcurrentMap::with_capacity_and_hasher(
///     64,
///     BuildHasherAdapter::new(RandomState::new()),
/// );
/// map.insert((1, 2), "pair");
/// assert_eq!(map.get(&(1, 2)), Some("pair"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct BuildHasherAdapter<S> {
    build_hasher: S,
}

impl<S> BuildHasherAdapter<S> {
    pub fn new(build_hasher: S) -> Self {
        Self { build_hasher }
    }

    pub fn build_hasher(&self) -> &S {
        &self.build_hasher
    }
}

impl<K, S> KeyHasher<K> for BuildHasherAdapter<S>
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = self.build_hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! `stepmap` provides [`ConcurrentMap`], a thread-safe hash map that grows by
//! migrating its entries a few buckets at a time.
//!
//! A plain hash map rehashes every entry when it grows, so the one insert that
//! crosses the load factor pays for the whole map. `ConcurrentMap` instead
//! keeps the old table alive next to the new one and spreads the rehashing
//! over the following operations: each `get`, `insert` or `remove` moves at
//! most a fixed number of buckets (10 by default). Lookups check the new table
//! first and then the old one, so every key stays visible during the move.
//!
//! # Example
//!
//! ```rust
//! use stepmap::ConcurrentMap;
//!
//! let map = ConcurrentMap::with_capacity(4);
//! for i in 0..100 {
//!     map.insert(format!("key{i}"), i);
//! }
//!
//! assert_eq!(map.len(), 100);
//! assert!(map.capacity() >= 128);
//! assert_eq!(map.get("key57"), Some(57));
//!
//! assert_eq!(map.remove("key57"), Some(57));
//! assert_eq!(map.get("key57"), None);
//! ```
//!
//! # Hashing
//!
//! Keys are hashed with a [`KeyHasher`](hash::KeyHasher) chosen when the map is
//! built. The default one covers text, integer and boolean keys, and
//! serializable keys wrapped in `Structured` when the `serde` feature is
//! enabled. See the [`hash`] module for the other options.
//!
//! # Crate features
//!
//! - `serde` (default): enables `hash::Structured` keys.
//! - `logging`: emits `log` records when a resize starts, progresses and
//!   completes.

pub(crate) mod common;
pub mod hash;
mod map;
pub mod stats;

pub use common::{
    constants::{DEFAULT_LOAD_FACTOR, DEFAULT_REHASH_STEP, MIN_CAPACITY},
    error::ConfigError,
};
pub use map::{ConcurrentMap, MapBuilder};

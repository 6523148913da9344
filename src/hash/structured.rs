use super::{HashKey, KeyShape};

use std::{
    borrow::Cow,
    ops::{Deref, DerefMut},
};

use serde::Serialize;

/// A key that the [`DefaultKeyHasher`][default-hasher] hashes by the JSON
/// serialization of its content.
///
/// Use it to key a map by tuples, structs or enums without writing a custom
/// hasher. The wrapped type's `Serialize` implementation must produce the same
/// output for equal values. In particular, a type containing a
/// `std::collections::HashMap` does not qualify, as the map's entries serialize
/// in an unspecified order. Use a `BTreeMap` or a custom hasher instead.
///
/// If serialization fails (for example, a map with non-string keys), the key
/// is hashed by its type name only. The map still works, but all such keys
/// land in the same bucket.
///
/// # Examples
///
/// ```rust
/// use stepmap::{hash::Structured, ConcurrentMap};
/// use serde::Serialize;
///
/// #[derive(Serialize, PartialEq, Eq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let map = ConcurrentMap::new();
/// map.insert(Structured(Point { x: 1, y: 2 }), "a");
/// assert_eq!(map.get(&Structured(Point { x: 1, y: 2 })), Some("a"));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Structured<T>(pub T);

impl<T> Structured<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Structured<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Structured<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<T> for Structured<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Serialize> HashKey for Structured<T> {
    fn shape(&self) -> KeyShape<'_> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => KeyShape::Structured(Cow::Owned(bytes)),
            Err(_e) => {
                let type_name = std::any::type_name::<T>();
                #[cfg(feature = "logging")]
                log::warn!(
                    "Hashing a {type_name} key by its type name only because it \
                    cannot be serialized: {_e}"
                );
                KeyShape::Structured(Cow::Borrowed(type_name.as_bytes()))
            }
        }
    }
}

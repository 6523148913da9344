use std::{borrow::Cow, rc::Rc, sync::Arc};

use xxhash_rust::xxh3::xxh3_64;

/// The shape of a key as seen by the [`DefaultKeyHasher`][default-hasher].
///
/// Each shape has a fixed byte encoding which is digested with XXH3. Keys of
/// different Rust types hash alike when they have the same shape and content.
/// For example, `7u8` and `7u64` collide, and so do `"a"` and
/// `String::from("a")`.
///
/// [default-hasher]: ./struct.DefaultKeyHasher.html
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyShape<'a> {
    /// Text, encoded as its UTF-8 bytes.
    Text(&'a str),
    /// A signed integer, sign extended to 64 bits and encoded big-endian.
    Signed(i64),
    /// An unsigned integer, zero extended to 64 bits and encoded big-endian.
    Unsigned(u64),
    /// A boolean, encoded as `"1"` or `"0"`.
    Bool(bool),
    /// Any other value, encoded by a deterministic serialization of its
    /// content.
    Structured(Cow<'a, [u8]>),
}

impl KeyShape<'_> {
    /// Returns the 64-bit digest of this shape.
    pub fn digest(&self) -> u64 {
        match self {
            Self::Text(text) => xxh3_64(text.as_bytes()),
            Self::Signed(n) => xxh3_64(&(*n as u64).to_be_bytes()),
            Self::Unsigned(n) => xxh3_64(&n.to_be_bytes()),
            Self::Bool(true) => xxh3_64(b"1"),
            Self::Bool(false) => xxh3_64(b"0"),
            Self::Structured(bytes) => xxh3_64(bytes),
        }
    }
}

/// A key type that the [`DefaultKeyHasher`][default-hasher] knows how to hash.
///
/// Implemented for text, the primitive integer types, `bool`, references and
/// smart pointers to such types, and (with the `serde` feature)
/// [`Structured`][structured] values.
///
/// Implement it for your own types by returning the shape of a canonical
/// representation. Equal keys must return equal shapes.
///
/// ```rust
/// use stepmap::hash::{HashKey, KeyShape};
///
/// #[derive(PartialEq, Eq)]
/// struct UserId(u64);
///
/// impl HashKey for UserId {
///     fn shape(&self) -> KeyShape<'_> {
///         KeyShape::Unsigned(self.0)
///     }
/// }
///
/// let map = stepmap::ConcurrentMap::new();
/// map.insert(UserId(7), "alice");
/// assert_eq!(map.get(&UserId(7)), Some("alice"));
/// ```
///
/// [default-hasher]: ./struct.DefaultKeyHasher.html
/// [structured]: ./struct.Structured.html
pub trait HashKey {
    fn shape(&self) -> KeyShape<'_>;
}

impl HashKey for str {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        KeyShape::Text(self)
    }
}

impl HashKey for String {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        KeyShape::Text(self.as_str())
    }
}

impl HashKey for Cow<'_, str> {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        KeyShape::Text(self.as_ref())
    }
}

impl HashKey for bool {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        KeyShape::Bool(*self)
    }
}

macro_rules! impl_hash_key_for_integers {
    ($variant:ident as $wide:ty: $($t:ty),+) => {
        $(
            impl HashKey for $t {
                #[inline]
                fn shape(&self) -> KeyShape<'_> {
                    KeyShape::$variant(*self as $wide)
                }
            }
        )+
    };
}

impl_hash_key_for_integers!(Signed as i64: i8, i16, i32, i64, isize);
impl_hash_key_for_integers!(Unsigned as u64: u8, u16, u32, u64, usize);

impl<T: HashKey + ?Sized> HashKey for &T {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        (**self).shape()
    }
}

impl<T: HashKey + ?Sized> HashKey for Box<T> {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        (**self).shape()
    }
}

impl<T: HashKey + ?Sized> HashKey for Arc<T> {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        (**self).shape()
    }
}

impl<T: HashKey + ?Sized> HashKey for Rc<T> {
    #[inline]
    fn shape(&self) -> KeyShape<'_> {
        (**self).shape()
    }
}

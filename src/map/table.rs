use std::{borrow::Borrow, mem};

use parking_lot::RwLock;
use smallvec::SmallVec;

pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    #[inline]
    fn matches<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        key == self.key.borrow()
    }
}

// Most chains hold zero or one entry at a load factor below one, so two
// entries are kept inline to avoid a heap allocation per bucket.
pub(crate) type Chain<K, V> = SmallVec<[Entry<K, V>; 2]>;

/// A chain of entries whose keys all hash to the same index of the owning
/// table. The lock is taken in shared mode by readers. Writers own the whole
/// table exclusively and bypass it via `RwLock::get_mut`.
pub(crate) struct Bucket<K, V> {
    chain: RwLock<Chain<K, V>>,
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self {
            chain: RwLock::new(SmallVec::new()),
        }
    }
}

/// A fixed-size, power-of-two array of buckets.
pub(crate) struct Table<K, V> {
    buckets: Box<[Bucket<K, V>]>,
}

impl<K, V> Table<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two());

        let buckets = std::iter::repeat_with(Bucket::default)
            .take(capacity)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self { buckets }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Maps a digest to a bucket index with the capacity mask. Falls back to a
    /// modulo if the masked value is somehow out of range.
    #[inline]
    pub(crate) fn index_for(&self, hash: u64) -> usize {
        let capacity = self.capacity() as u64;
        let index = hash & (capacity - 1);
        if index < capacity {
            index as usize
        } else {
            (hash % capacity) as usize
        }
    }

    /// Calls `with_value` on the value of the entry matching `key`, taking the
    /// bucket lock in shared mode. Gives `with_value` back if there is no such
    /// entry, so that the caller can try another table.
    pub(crate) fn find_with<Q, F, T>(&self, hash: u64, key: &Q, with_value: F) -> Result<T, F>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        F: FnOnce(&V) -> T,
    {
        let chain = self.buckets[self.index_for(hash)].chain.read();
        match chain.iter().find(|entry| entry.matches(key)) {
            Some(entry) => Ok(with_value(&entry.value)),
            None => Err(with_value),
        }
    }

    pub(crate) fn value_mut<Q>(&mut self, hash: u64, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.chain_mut(hash)
            .iter_mut()
            .find(|entry| entry.matches(key))
            .map(|entry| &mut entry.value)
    }

    /// Appends `entry` to its chain. The caller must have checked that no
    /// entry with an equal key exists in either table.
    pub(crate) fn push(&mut self, hash: u64, entry: Entry<K, V>) {
        self.chain_mut(hash).push(entry);
    }

    pub(crate) fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let chain = self.chain_mut(hash);
        let position = chain.iter().position(|entry| entry.matches(key))?;
        // Chains carry no ordering, so the last entry may fill the hole.
        Some(chain.swap_remove(position))
    }

    /// Takes the whole chain out of the bucket at `index`, leaving it empty.
    pub(crate) fn detach(&mut self, index: usize) -> Chain<K, V> {
        mem::take(self.buckets[index].chain.get_mut())
    }

    #[inline]
    fn chain_mut(&mut self, hash: u64) -> &mut Chain<K, V> {
        let index = self.index_for(hash);
        self.buckets[index].chain.get_mut()
    }

    #[cfg(test)]
    pub(crate) fn entries(&mut self) -> impl Iterator<Item = (usize, &Entry<K, V>)> + '_ {
        self.buckets
            .iter_mut()
            .enumerate()
            .flat_map(|(index, bucket)| bucket.chain.get_mut().iter().map(move |e| (index, e)))
    }
}

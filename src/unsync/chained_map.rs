use crate::common::{self, builder_utils, key_hasher::KeyHasher, DEFAULT_CAPACITY};

use std::fmt;

/// A hash map that is _not_ thread-safe, resolving collisions by separate
/// chaining.
///
/// `ChainedMap` has a fixed number of buckets. Keys are hashed and compared by a
/// [`KeyHasher`][key-hasher], the same strategy used by
/// [`sync::Cache`][sync-cache]. Each bucket keeps its entries in insertion order.
///
/// # Examples
///
/// ```rust
/// use cachemap::{unsync::ChainedMap, Fnv1aHasher};
///
/// let mut map = ChainedMap::new(Fnv1aHasher);
///
/// assert_eq!(map.insert("a", "abc"), None);
/// assert_eq!(map.get(&"a"), Some(&"abc"));
///
/// // Overwriting does not change the length.
/// assert_eq!(map.insert("a", "def"), Some("abc"));
/// assert_eq!(map.len(), 1);
///
/// assert_eq!(map.remove(&"a"), Some("def"));
/// assert!(map.is_empty());
/// ```
///
/// [key-hasher]: ../trait.KeyHasher.html
/// [sync-cache]: ../sync/struct.Cache.html
pub struct ChainedMap<K, V, H> {
    buckets: Box<[Vec<(K, V)>]>,
    len: usize,
    key_hasher: H,
}

impl<K, V, H> ChainedMap<K, V, H>
where
    H: KeyHasher<K>,
{
    /// Creates an empty `ChainedMap` with 10,000 buckets.
    pub fn new(key_hasher: H) -> Self {
        Self::with_capacity(key_hasher, DEFAULT_CAPACITY)
    }

    /// Creates an empty `ChainedMap` with `capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than `u32::MAX`.
    pub fn with_capacity(key_hasher: H, capacity: usize) -> Self {
        builder_utils::ensure_capacity_or_panic(capacity);
        Self {
            buckets: (0..capacity).map(|_| Vec::new()).collect(),
            len: 0,
            key_hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn key_hasher(&self) -> &H {
        &self.key_hasher
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already had this key, the value is replaced and the old value is
    /// returned; the length does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(&key);
        let key_hasher = &self.key_hasher;
        let chain = &mut self.buckets[index];

        match chain
            .iter_mut()
            .find(|(k, _)| key_hasher.keys_equal(k, &key))
        {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                chain.push((key, value));
                self.len += 1;
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let chain = &self.buckets[self.bucket_index(key)];
        chain
            .iter()
            .find(|(k, _)| self.key_hasher.keys_equal(k, key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key from the map, returning its value if the key was there.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.bucket_index(key);
        let key_hasher = &self.key_hasher;
        let chain = &mut self.buckets[index];

        let pos = chain
            .iter()
            .position(|(k, _)| key_hasher.keys_equal(k, key))?;
        self.len -= 1;
        Some(chain.remove(pos).1)
    }

    #[inline]
    fn bucket_index(&self, key: &K) -> usize {
        common::bucket_index(self.key_hasher.hash_key(key), self.buckets.len())
    }
}

impl<K, V, H> fmt::Debug for ChainedMap<K, V, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.buckets
                    .iter()
                    .flat_map(|chain| chain.iter().map(|(k, v)| (k, v))),
            )
            .finish()
    }
}

use super::Cache;
use crate::common::{
    builder_utils, error::BuildError, key_hasher::DefaultKeyHasher, key_hasher::KeyHasher,
};

use std::{hash::Hash, marker::PhantomData};

/// Builds a [`Cache`][cache-struct] with various configuration knobs.
///
/// [cache-struct]: ./struct.Cache.html
///
/// # Examples
///
/// ```rust
/// use cachemap::{sync::CacheBuilder, Fnv1aHasher};
///
/// let cache = CacheBuilder::with_key_hasher(10_000, Fnv1aHasher) // 10,000 buckets
///     // Returned by `get` for missing keys.
///     .empty_value(String::new())
///     // Shows up in log lines when the `logging` feature is enabled.
///     .name("documents")
///     // Create the cache.
///     .build()
///     .expect("invalid configuration");
///
/// cache.get_with("a".to_string(), || "abc".to_string());
/// assert_eq!(cache.get(&"a".to_string()).into_option(), Some("abc".to_string()));
/// ```
///
pub struct CacheBuilder<K, V, H> {
    name: Option<String>,
    capacity: usize,
    empty_value: Option<V>,
    key_hasher: H,
    key_type: PhantomData<fn(&K)>,
}

impl<K, V> CacheBuilder<K, V, DefaultKeyHasher>
where
    K: Hash + Eq,
{
    /// Constructs a new `CacheBuilder` for a cache with `capacity` buckets, hashing
    /// and comparing keys with their `Hash` and `Eq` implementations.
    pub fn new(capacity: usize) -> Self {
        Self::with_key_hasher(capacity, DefaultKeyHasher::new())
    }
}

impl<K, V, H> CacheBuilder<K, V, H> {
    /// Constructs a new `CacheBuilder` for a cache with `capacity` buckets, hashing
    /// and comparing keys with the given `key_hasher`.
    pub fn with_key_hasher(capacity: usize, key_hasher: H) -> Self {
        Self {
            name: None,
            capacity,
            empty_value: None,
            key_hasher,
            key_type: PhantomData,
        }
    }

    /// Sets the name of the cache. The name is used as a prefix of log messages.
    pub fn name(self, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..self
        }
    }

    /// Sets the number of buckets of the cache. The number of buckets is fixed for
    /// the lifetime of the cache.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Sets the value returned (as [`Maybe::Absent`][absent]) by
    /// [`Cache::get`][get] for missing keys.
    ///
    /// [absent]: ../enum.Maybe.html#variant.Absent
    /// [get]: ./struct.Cache.html#method.get
    pub fn empty_value(self, empty_value: V) -> Self {
        Self {
            empty_value: Some(empty_value),
            ..self
        }
    }

    /// Replaces the strategy to hash and compare keys.
    pub fn key_hasher<H2>(self, key_hasher: H2) -> CacheBuilder<K, V, H2>
    where
        H2: KeyHasher<K>,
    {
        CacheBuilder {
            name: self.name,
            capacity: self.capacity,
            empty_value: self.empty_value,
            key_hasher,
            key_type: PhantomData,
        }
    }

    /// Builds a `Cache<K, V, H>`.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`][build-error] if the capacity is zero or larger
    /// than `u32::MAX`, or if no empty value was set.
    ///
    /// [build-error]: ../enum.BuildError.html
    pub fn build(self) -> Result<Cache<K, V, H>, BuildError>
    where
        H: KeyHasher<K>,
        V: Clone,
    {
        builder_utils::validate_capacity(self.capacity)?;
        let empty_value = self.empty_value.ok_or(BuildError::MissingEmptyValue)?;
        Ok(Cache::with_everything(
            self.name,
            self.capacity,
            self.key_hasher,
            empty_value,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::CacheBuilder;
    use crate::{
        common::key_hasher::{ConstantHasher, Fnv1aHasher},
        BuildError,
    };

    #[test]
    fn build_cache() {
        // Cache<char, String>
        let cache = CacheBuilder::new(100).empty_value(String::new()).build();
        let cache = cache.expect("Failed to build");
        assert_eq!(cache.capacity(), 100);
        assert_eq!(cache.name(), None);

        cache.get_with('a', || "Alice".to_string());
        assert_eq!(cache.get(&'a').into_option(), Some("Alice".to_string()));

        // Cache<&str, u32>
        let cache = CacheBuilder::with_key_hasher(10, Fnv1aHasher)
            .name("lengths")
            .capacity(20)
            .empty_value(0)
            .build()
            .expect("Failed to build");
        assert_eq!(cache.capacity(), 20);
        assert_eq!(cache.name(), Some("lengths"));

        assert_eq!(cache.get_with("alice", || 5), 5);
        assert_eq!(cache.get(&"alice").into_option(), Some(5));
        assert_eq!(cache.get(&"bob").into_value(), 0);
    }

    #[test]
    fn replace_key_hasher() {
        let cache = CacheBuilder::new(4)
            .empty_value(0u32)
            .key_hasher(ConstantHasher)
            .build()
            .expect("Failed to build");

        for key in 0..10u32 {
            assert_eq!(cache.get_with(key, || key * 2), key * 2);
        }
        assert_eq!(cache.size(), 10);
        // Every key collides into bucket 0.
        assert_eq!(cache.bucket_len_of(&0), 10);
        assert_eq!(cache.bucket_len_of(&9), 10);
    }

    #[test]
    fn build_errors() {
        let result = CacheBuilder::<u32, u32, _>::new(0).empty_value(0).build();
        assert_eq!(result.err(), Some(BuildError::ZeroCapacity));

        let result = CacheBuilder::<u32, u32, _>::new(16).build();
        assert_eq!(result.err(), Some(BuildError::MissingEmptyValue));
    }
}

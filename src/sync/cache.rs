use super::{
    bucket::{BucketArray, CellRef},
    value_cell::Claim,
    CacheBuilder,
};
use crate::common::{
    self, builder_utils, key_hasher::DefaultKeyHasher, key_hasher::KeyHasher, maybe::Maybe,
};

use crossbeam_utils::CachePadded;
use std::{
    convert::Infallible,
    fmt,
    hash::Hash,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// A thread-safe memoizing cache with a fixed number of buckets.
///
/// `Cache` maps each key to a value computed at most once by a caller-supplied
/// `init` closure. Values are never evicted, updated or removed; the cache only
/// grows until it is dropped.
///
/// Every bucket has its own lock, and every key has its own synchronization
/// point for its value. A slow `init` closure for one key therefore never delays
/// a caller asking for another key, even when both keys share a bucket.
///
/// # Examples
///
/// Here's an example of filling a cache from multiple threads:
///
/// ```rust
/// use cachemap::sync::Cache;
///
/// use std::thread;
///
/// fn value(n: usize) -> String {
///     format!("value {}", n)
/// }
///
/// const NUM_THREADS: usize = 16;
/// const NUM_KEYS_PER_THREAD: usize = 64;
///
/// // Create a cache with 1,024 buckets.
/// let cache = Cache::new(1_024);
///
/// // Spawn threads and fill the cache simultaneously.
/// let threads: Vec<_> = (0..NUM_THREADS)
///     .map(|i| {
///         // To share the same cache across the threads, clone it.
///         // This is a cheap operation.
///         let my_cache = cache.clone();
///         let start = i * NUM_KEYS_PER_THREAD;
///         let end = (i + 1) * NUM_KEYS_PER_THREAD;
///
///         thread::spawn(move || {
///             for key in start..end {
///                 // get_with() returns a clone of the stored value.
///                 assert_eq!(my_cache.get_with(key, || value(key)), value(key));
///             }
///         })
///     })
///     .collect();
///
/// // Wait for all threads to complete.
/// threads.into_iter().for_each(|t| t.join().expect("Failed"));
///
/// // Verify the result.
/// assert_eq!(cache.size(), NUM_THREADS * NUM_KEYS_PER_THREAD);
/// for key in 0..(NUM_THREADS * NUM_KEYS_PER_THREAD) {
///     assert_eq!(cache.get(&key).into_option(), Some(value(key)));
/// }
/// ```
///
/// # Avoiding to clone the value at `get`
///
/// Every lookup returns a clone of the stored value `V`. If you want to store
/// values that will be expensive to clone, wrap them by `std::sync::Arc` before
/// storing in a cache.
///
/// # Hashing and comparing keys
///
/// Keys are hashed and compared by the [`KeyHasher`][key-hasher] given at
/// construction time. [`Cache::new`](#method.new) and
/// [`Cache::builder`](#method.builder) use the `Hash` and `Eq` implementations of
/// the key type. Use [`Cache::builder_with_key_hasher`](#method.builder_with_key_hasher)
/// to plug in another strategy.
///
/// [key-hasher]: ../trait.KeyHasher.html
pub struct Cache<K, V, H = DefaultKeyHasher> {
    inner: Arc<Inner<K, V, H>>,
}

// The cache shares its inner state; cloning does not require `K: Clone` etc.
impl<K, V, H> Clone for Cache<K, V, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, H> fmt::Debug for Cache<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.buckets.len())
            .field("size", &self.inner.size())
            .finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V, DefaultKeyHasher>
where
    K: Hash + Eq,
    V: Clone + Default,
{
    /// Constructs a new `Cache<K, V>` with `capacity` buckets. `V::default()` is
    /// used as the empty value.
    ///
    /// To set the empty value or the key hasher, use the
    /// [`CacheBuilder`][builder-struct].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than `u32::MAX`.
    ///
    /// [builder-struct]: ./struct.CacheBuilder.html
    pub fn new(capacity: usize) -> Self {
        builder_utils::ensure_capacity_or_panic(capacity);
        Self::with_everything(None, capacity, DefaultKeyHasher::new(), V::default())
    }
}

impl<K, V> Cache<K, V, DefaultKeyHasher>
where
    K: Hash + Eq,
{
    /// Returns a [`CacheBuilder`][builder-struct] for a cache with `capacity`
    /// buckets, which hashes and compares keys with their `Hash` and `Eq`
    /// implementations.
    ///
    /// [builder-struct]: ./struct.CacheBuilder.html
    pub fn builder(capacity: usize) -> CacheBuilder<K, V, DefaultKeyHasher> {
        CacheBuilder::new(capacity)
    }
}

impl<K, V, H> Cache<K, V, H> {
    /// Returns a [`CacheBuilder`][builder-struct] for a cache with `capacity`
    /// buckets, which hashes and compares keys with `key_hasher`.
    ///
    /// [builder-struct]: ./struct.CacheBuilder.html
    pub fn builder_with_key_hasher(capacity: usize, key_hasher: H) -> CacheBuilder<K, V, H> {
        CacheBuilder::with_key_hasher(capacity, key_hasher)
    }

    pub(crate) fn with_everything(
        name: Option<String>,
        capacity: usize,
        key_hasher: H,
        empty_value: V,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                buckets: BucketArray::new(capacity),
                key_hasher,
                empty_value,
                entry_count: CachePadded::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Returns the name of this cache.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Returns the number of buckets of this cache.
    pub fn capacity(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Returns the number of keys in this cache.
    ///
    /// A key is counted from the moment its entry is created by `get_with` (or
    /// `try_get_with`), so an entry whose value is still being computed is
    /// included. A key whose `init` closure failed is not counted once the
    /// failure has been handled.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Returns a reference to the key hasher of this cache.
    pub fn key_hasher(&self) -> &H {
        &self.inner.key_hasher
    }
}

impl<K, V, H> Cache<K, V, H>
where
    H: KeyHasher<K>,
    V: Clone,
{
    /// Returns a _clone_ of the value corresponding to the key, wrapped in
    /// [`Maybe::Present`][present].
    ///
    /// This method never evaluates an `init` closure. If the key does not exist,
    /// it returns [`Maybe::Absent`][absent] with the empty value of the cache.
    ///
    /// If the value of the key is being computed by another thread, this method
    /// blocks until the computation completes. If that computation fails, the
    /// key is treated as missing.
    ///
    /// [present]: ../enum.Maybe.html#variant.Present
    /// [absent]: ../enum.Maybe.html#variant.Absent
    pub fn get(&self, key: &K) -> Maybe<V> {
        let index = self.inner.bucket_index(key);
        loop {
            match self.inner.buckets.find_cell(index, key, &self.inner.key_hasher) {
                None => return Maybe::Absent(self.inner.empty_value.clone()),
                Some(cell) => {
                    if let Some(v) = cell.wait_ready() {
                        return Maybe::Present(v);
                    }
                    // The cell was abandoned and has already been unlinked.
                    // Another caller may have started over; look again.
                }
            }
        }
    }

    /// Returns `true` if the value of the key has been computed.
    ///
    /// Unlike [`get`](#method.get), this method never blocks on a computation
    /// in progress.
    pub fn contains_key(&self, key: &K) -> bool {
        let index = self.inner.bucket_index(key);
        self.inner
            .buckets
            .find_cell(index, key, &self.inner.key_hasher)
            .and_then(|cell| cell.peek())
            .is_some()
    }

    /// Ensures the value of the key exists by inserting the result of the init
    /// closure if not exist, and returns a _clone_ of the value.
    ///
    /// This method prevents to evaluate the init closure multiple times on the same
    /// key even if the method is concurrently called by many threads; only one of
    /// the calls evaluates its closure, and other calls wait for that closure to
    /// complete. Calls for other keys are not blocked.
    ///
    /// Calling `get_with` for the same key from inside its own `init` closure
    /// never returns: the call waits for the very computation it is part of.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cachemap::sync::Cache;
    /// use std::{sync::Arc, thread};
    ///
    /// const TEN_MIB: usize = 10 * 1024 * 1024; // 10MiB
    /// let cache = Cache::new(100);
    ///
    /// // Spawn four threads.
    /// let threads: Vec<_> = (0..4_u8)
    ///     .map(|task_id| {
    ///         let my_cache = cache.clone();
    ///         thread::spawn(move || {
    ///             // Although all four threads will call `get_with` at the same
    ///             // time, the `init` closure must be evaluated only once.
    ///             let value = my_cache.get_with("key1", || {
    ///                 println!("Thread {} inserting a value.", task_id);
    ///                 Arc::new(vec![0u8; TEN_MIB])
    ///             });
    ///
    ///             assert_eq!(value.len(), TEN_MIB);
    ///             assert!(my_cache.contains_key(&"key1"));
    ///         })
    ///     })
    ///     .collect();
    ///
    /// threads
    ///     .into_iter()
    ///     .for_each(|t| t.join().expect("Thread failed"));
    ///
    /// assert_eq!(cache.size(), 1);
    /// ```
    ///
    /// # Panics
    ///
    /// This method panics when the `init` closure has been panicked. When it
    /// happens, only the caller whose `init` closure panicked will get the panic.
    /// The key is released, so that one of the other callers waiting on it (or a
    /// later caller) evaluates its own `init` closure.
    pub fn get_with(&self, key: K, init: impl FnOnce() -> V) -> V {
        match self.try_get_with(key, || Ok::<_, Infallible>(init())) {
            Ok(v) => v,
            Err(e) => match e {},
        }
    }

    /// Try to ensure the value of the key exists by inserting an `Ok` result of the
    /// init closure if not exist, and returns a _clone_ of the value or the `Err`
    /// returned by the closure.
    ///
    /// As with [`get_with`](#method.get_with), only one of the concurrent calls
    /// for a key evaluates its closure at a time. If the closure returns an `Err`,
    /// nothing is inserted, the error is returned to that caller only, and the key
    /// is released: the other callers waiting on it start over, and one of them
    /// evaluates its own closure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cachemap::sync::Cache;
    ///
    /// let cache = Cache::new(16);
    ///
    /// let r: Result<u64, String> = cache.try_get_with("file", || Err("not yet".into()));
    /// assert!(r.is_err());
    /// assert_eq!(cache.size(), 0);
    ///
    /// let r: Result<u64, String> = cache.try_get_with("file", || Ok(1024));
    /// assert_eq!(r, Ok(1024));
    /// assert_eq!(cache.size(), 1);
    /// ```
    ///
    /// # Panics
    ///
    /// This method panics when the `init` closure has been panicked, releasing the
    /// key in the same way as an `Err`.
    pub fn try_get_with<F, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let hash = self.inner.key_hasher.hash_key(&key);
        let key = Arc::new(key);
        self.inner.try_get_with_hash_and_fun(key, hash, init)
    }

    #[cfg(test)]
    pub(crate) fn bucket_len_of(&self, key: &K) -> usize {
        self.inner.buckets.bucket_len(self.inner.bucket_index(key))
    }
}

struct Inner<K, V, H> {
    name: Option<String>,
    buckets: BucketArray<K, V>,
    key_hasher: H,
    empty_value: V,
    entry_count: CachePadded<AtomicUsize>,
}

impl<K, V, H> Inner<K, V, H> {
    fn size(&self) -> usize {
        self.entry_count.load(Ordering::Acquire)
    }

    /// Unlinks a cell whose computation failed and wakes up its waiters.
    fn release(&self, index: usize, cell: &CellRef<V>) {
        self.buckets.remove_cell(index, cell, &self.entry_count);
        cell.abandon();
    }
}

impl<K, V, H> Inner<K, V, H>
where
    H: KeyHasher<K>,
    V: Clone,
{
    #[inline]
    fn bucket_index(&self, key: &K) -> usize {
        common::bucket_index(self.key_hasher.hash_key(key), self.buckets.len())
    }

    fn try_get_with_hash_and_fun<F, E>(&self, key: Arc<K>, hash: u32, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

        let index = common::bucket_index(hash, self.buckets.len());

        loop {
            let (cell, _) = self.buckets.find_or_create_cell(
                index,
                &key,
                &self.key_hasher,
                &self.entry_count,
            );

            match cell.claim() {
                Claim::Ready(v) => return Ok(v),
                Claim::Abandoned => {
                    // Somebody else's init closure failed. Retry from the
                    // beginning.
                    #[cfg(feature = "logging")]
                    log::trace!(
                        "{}Retrying after an abandoned computation",
                        name_prefix(self.name.as_deref())
                    );
                    continue;
                }
                Claim::Won => (),
            }

            // Catching panic is safe here as we do not try to evaluate the closure
            // again. The value is cloned inside the guard too, so a panicking
            // `V::clone` also releases the key.
            let result = catch_unwind(AssertUnwindSafe(|| {
                init().map(|value| {
                    let copy = value.clone();
                    (value, copy)
                })
            }));
            match result {
                // Evaluated.
                Ok(Ok((value, copy))) => {
                    cell.commit(copy);
                    return Ok(value);
                }
                // Returned an error. Release the key so that others can retry.
                Ok(Err(e)) => {
                    self.release(index, &cell);
                    #[cfg(feature = "logging")]
                    log::debug!(
                        "{}The init closure returned an error; released the key",
                        name_prefix(self.name.as_deref())
                    );
                    return Err(e);
                }
                // Panicked.
                Err(payload) => {
                    self.release(index, &cell);
                    #[cfg(feature = "logging")]
                    log_panic(&*payload, self.name.as_deref());
                    resume_unwind(payload);
                }
            }
        }
    }
}

#[cfg(feature = "logging")]
fn name_prefix(cache_name: Option<&str>) -> String {
    cache_name
        .map(|name| format!("[{name}] "))
        .unwrap_or_default()
}

#[cfg(feature = "logging")]
fn log_panic(payload: &(dyn std::any::Any + Send + 'static), cache_name: Option<&str>) {
    // Try to downcast the payload into &str or String.
    let message: Option<std::borrow::Cow<'_, str>> =
        (payload.downcast_ref::<&str>().map(|s| (*s).into()))
            .or_else(|| payload.downcast_ref::<String>().map(Into::into));

    let cn = name_prefix(cache_name);

    if let Some(m) = message {
        log::error!("{cn}Released the key because the init closure panicked at '{m}'");
    } else {
        log::error!("{cn}Released the key because the init closure panicked");
    }
}

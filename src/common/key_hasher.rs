use std::{
    collections::hash_map::RandomState,
    fmt,
    hash::{BuildHasher, Hash, Hasher},
};

/// Describes how to hash a key and how to compare two keys.
///
/// Caches and maps in this crate never call `Hash` or `Eq` on the key type
/// directly. They go through a `KeyHasher` instead, so identity can be defined
/// independently of the key type.
///
/// Implementations must be consistent: two keys for which `keys_equal` returns
/// `true` must have the same `hash_key`. A poor hash (even a constant one) is
/// allowed; it only makes the bucket chains longer.
pub trait KeyHasher<K: ?Sized> {
    /// Returns a 32-bit hash value for the `key`.
    fn hash_key(&self, key: &K) -> u32;

    /// Determines if two keys are equivalent.
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// A 32-bit [FNV-1a][fnv] hash over the bytes of the key.
///
/// Keys are compared byte-wise.
///
/// [fnv]: http://www.isthe.com/chongo/tech/comp/fnv/index.html
#[derive(Clone, Copy, Debug, Default)]
pub struct Fnv1aHasher;

impl<K> KeyHasher<K> for Fnv1aHasher
where
    K: AsRef<[u8]> + ?Sized,
{
    fn hash_key(&self, key: &K) -> u32 {
        key.as_ref().iter().fold(FNV_OFFSET, |hash, &byte| {
            (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
        })
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Adapts a [`BuildHasher`] to the `KeyHasher` trait, for keys that implement
/// `Hash` and `Eq`.
///
/// The 64-bit hash is folded into 32 bits.
#[derive(Clone, Debug, Default)]
pub struct DefaultKeyHasher<S = RandomState> {
    build_hasher: S,
}

impl DefaultKeyHasher<RandomState> {
    /// Creates a `DefaultKeyHasher` with a randomly seeded `RandomState`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> DefaultKeyHasher<S> {
    /// Creates a `DefaultKeyHasher` that hashes keys with `build_hasher`.
    pub fn with_hasher(build_hasher: S) -> Self {
        Self { build_hasher }
    }

    /// Returns a reference to the `BuildHasher` of this key hasher.
    pub fn hasher(&self) -> &S {
        &self.build_hasher
    }
}

impl<K, S> KeyHasher<K> for DefaultKeyHasher<S>
where
    K: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    fn hash_key(&self, key: &K) -> u32 {
        let mut hasher = self.build_hasher.build_hasher();
        key.hash(&mut hasher);
        let hash = hasher.finish();
        ((hash >> 32) ^ hash) as u32
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// A `KeyHasher` made of a hash closure and an equality closure.
///
/// # Examples
///
/// ```rust
/// use cachemap::{FnKeyHasher, KeyHasher};
///
/// // Case-insensitive keys.
/// let hasher = FnKeyHasher::new(
///     |k: &String| k.to_ascii_lowercase().len() as u32,
///     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
/// );
///
/// let (a, b) = ("Alice".to_string(), "ALICE".to_string());
/// assert!(hasher.keys_equal(&a, &b));
/// assert_eq!(hasher.hash_key(&a), hasher.hash_key(&b));
/// ```
#[derive(Clone)]
pub struct FnKeyHasher<H, E> {
    hash: H,
    eq: E,
}

impl<H, E> FnKeyHasher<H, E> {
    pub fn new(hash: H, eq: E) -> Self {
        Self { hash, eq }
    }
}

impl<K, H, E> KeyHasher<K> for FnKeyHasher<H, E>
where
    K: ?Sized,
    H: Fn(&K) -> u32,
    E: Fn(&K, &K) -> bool,
{
    fn hash_key(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        (self.eq)(a, b)
    }
}

impl<H, E> fmt::Debug for FnKeyHasher<H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnKeyHasher").finish_non_exhaustive()
    }
}

/// A deliberately bad `KeyHasher` that hashes every key to `0`.
///
/// Every key lands in the first bucket, so lookups degrade to a linear scan of a
/// single chain. Results stay correct. Useful to exercise collision handling.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantHasher;

impl<K> KeyHasher<K> for ConstantHasher
where
    K: Eq + ?Sized,
{
    fn hash_key(&self, _key: &K) -> u32 {
        0
    }

    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

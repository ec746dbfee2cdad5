pub(crate) mod builder_utils;
pub(crate) mod error;
pub(crate) mod key_hasher;
pub(crate) mod maybe;

/// The number of buckets used by [`ChainedMap::new`][chained-map-new].
///
/// [chained-map-new]: ../unsync/struct.ChainedMap.html#method.new
pub(crate) const DEFAULT_CAPACITY: usize = 10_000;

// Maps a 32-bit key hash onto one of `capacity` buckets.
#[inline]
pub(crate) fn bucket_index(hash: u32, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    hash as usize % capacity
}

#[cfg(test)]
pub(crate) fn available_parallelism() -> usize {
    use std::{num::NonZeroUsize, thread::available_parallelism};
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// The error type returned by [`CacheBuilder::build`][build].
///
/// [build]: ./sync/struct.CacheBuilder.html#method.build
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The cache was configured with zero buckets.
    #[error("capacity must be a positive number of buckets")]
    ZeroCapacity,

    /// The cache was configured with more buckets than a 32-bit key hash can
    /// address.
    #[error(
        "capacity of {capacity} buckets exceeds the number of buckets a 32-bit \
    key hash can address"
    )]
    CapacityOverflow {
        /// The requested number of buckets.
        capacity: usize,
    },

    /// The builder was asked to build a cache without an empty value.
    ///
    /// The empty value is returned by [`Cache::get`][get] for missing keys. Set it
    /// by calling the [`CacheBuilder::empty_value`][empty-value] method.
    ///
    /// [get]: ./sync/struct.Cache.html#method.get
    /// [empty-value]: ./sync/struct.CacheBuilder.html#method.empty_value
    #[error(
        "No empty value was configured for this cache. \
    Please set one by calling the empty_value method of the builder"
    )]
    MissingEmptyValue,
}

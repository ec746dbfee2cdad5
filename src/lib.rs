#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! `cachemap` provides a fixed-capacity, thread-safe memoizing cache.
//!
//! A [`sync::Cache`] maps keys to values that are computed lazily by a
//! caller-supplied `init` closure. Concurrent calls for the _same_ missing key
//! evaluate the closure only once; the other callers wait for it and share the
//! result. Calls for _different_ keys never wait on each other, even if one of
//! the closures is slow.
//!
//! Keys are hashed and compared through a [`KeyHasher`], so the cache works with
//! key types that do not implement `Hash` or `Eq`, or that need a different
//! notion of identity.
//!
//! # Example
//!
//! ```rust
//! use cachemap::{sync::Cache, Fnv1aHasher};
//!
//! let cache = Cache::builder_with_key_hasher(1_024, Fnv1aHasher)
//!     .empty_value(String::new())
//!     .build()
//!     .unwrap();
//!
//! let value = cache.get_with("answer".to_string(), || "42".to_string());
//! assert_eq!(value, "42");
//!
//! // The closure is not evaluated again for a cached key.
//! let value = cache.get_with("answer".to_string(), || unreachable!());
//! assert_eq!(value, "42");
//! assert_eq!(cache.size(), 1);
//!
//! let missing = cache.get(&"question".to_string());
//! assert!(!missing.is_present());
//! ```
//!
//! A single-threaded chained hash map sharing the same hashing strategy lives in
//! [`unsync`].

pub(crate) mod common;
pub mod sync;
pub mod unsync;

pub use common::{
    error::BuildError,
    key_hasher::{ConstantHasher, DefaultKeyHasher, FnKeyHasher, Fnv1aHasher, KeyHasher},
    maybe::Maybe,
};

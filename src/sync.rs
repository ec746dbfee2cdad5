//! Provides a thread-safe, concurrent memoizing cache.

mod bucket;
mod builder;
mod cache;
mod value_cell;

pub use {builder::CacheBuilder, cache::Cache};

//! Provides a single-threaded chained hash map.

mod chained_map;

pub use chained_map::ChainedMap;

//! tscache library
//!
//! A transparent on-disk cache for functions that produce timestamp-indexed
//! tables. Wrap a [`persist::Producer`] in a [`persist::PersistTimeseries`]
//! and call it with a [`data::TimestampSet`]; a request fully present on disk
//! is served from the cache file, anything else runs the producer and merges
//! its rows into the file.

pub mod cache;
pub mod cli;
pub mod data;
pub mod persist;

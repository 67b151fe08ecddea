//! On-disk cache for timestamp-indexed datasets
//!
//! This module holds the pieces the caching wrapper is assembled from: the
//! serialization formats, the cache file itself, the coverage check and the
//! merge step that folds fresh rows into what is already stored.

mod coverage;
mod format;
mod manager;
mod merge;

pub use coverage::{is_fully_covered, missing_timestamps};
pub use format::{write_csv, CacheError, PersistenceFormat};
pub use manager::CacheFile;
pub use merge::{merge_and_save, replace_and_save};

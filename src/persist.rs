//! Transparent caching around timestamp-indexed producers
//!
//! [`PersistTimeseries`] wraps any [`Producer`] and decides per call whether
//! the requested timestamps can be served from the cache file, or whether the
//! producer has to run and its rows be folded into the cache.
//!
//! # Concurrency
//!
//! Each call performs at most one full read and one full write of the cache
//! file, with no locking. Two calls racing on the same cache path may both
//! read the old state and the later write wins. Use one writer per cache path.

use crate::cache::{
    is_fully_covered, merge_and_save, missing_timestamps, replace_and_save, CacheError, CacheFile,
    PersistenceFormat,
};
use crate::data::{TabularDataset, TimestampSet};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A source of timestamp-indexed data
///
/// Implementations must accept any subset of timestamps and must not rely on
/// earlier calls having happened.
pub trait Producer {
    /// Extra parameters forwarded untouched on every call
    type Params;
    type Error;

    fn produce(
        &self,
        timestamps: &TimestampSet,
        params: &Self::Params,
    ) -> Result<TabularDataset, Self::Error>;
}

impl<F, E> Producer for F
where
    F: Fn(&TimestampSet) -> Result<TabularDataset, E>,
{
    type Params = ();
    type Error = E;

    fn produce(&self, timestamps: &TimestampSet, _params: &()) -> Result<TabularDataset, E> {
        self(timestamps)
    }
}

/// Per-call cache settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Whether the cache is consulted at all
    pub enable_cache: bool,
    /// Directory of the cache file; the working directory when `None`
    pub cache_path: Option<PathBuf>,
    /// Rebuild the cache from this call's rows, skipping the coverage check
    pub force_update: bool,
}

impl CallOptions {
    /// Options with the cache enabled and everything else defaulted
    pub fn cached() -> Self {
        Self {
            enable_cache: true,
            ..Self::default()
        }
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_force_update(mut self, force_update: bool) -> Self {
        self.force_update = force_update;
        self
    }
}

/// Which path a call took through the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Cache disabled; the producer ran and nothing touched disk
    Bypass,
    /// All timestamps were cached; no producer call and no write
    Hit,
    /// The producer ran; `written` is false when it returned no rows
    Miss { written: bool },
    /// The producer ran and its rows replaced the cache
    ForceFetch,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOutcome::Bypass => f.write_str("bypass"),
            CacheOutcome::Hit => f.write_str("hit"),
            CacheOutcome::Miss { written: true } => f.write_str("miss (cache updated)"),
            CacheOutcome::Miss { written: false } => f.write_str("miss (cache unchanged)"),
            CacheOutcome::ForceFetch => f.write_str("forced update"),
        }
    }
}

/// Errors surfaced by a cached call
#[derive(Debug, Error)]
pub enum PersistError<E> {
    /// The wrapped producer failed; carried as is
    #[error("Producer failed: {0}")]
    Producer(E),

    /// The cache directory or file could not be written
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl<E> PersistError<E> {
    /// Returns the producer's own error, if that is what failed
    pub fn into_producer_error(self) -> Option<E> {
        match self {
            PersistError::Producer(e) => Some(e),
            PersistError::Cache(_) => None,
        }
    }
}

/// A producer wrapped with a file-backed timestamp cache
///
/// The cache format is fixed at construction from the file name's suffix.
#[derive(Debug)]
pub struct PersistTimeseries<P> {
    producer: P,
    file_name: String,
    format: PersistenceFormat,
}

impl<P: Producer> PersistTimeseries<P> {
    /// Wraps `producer` with a cache stored as `file_name`
    ///
    /// # Errors
    /// * `CacheError::MissingFileName` if `file_name` is empty
    /// * `CacheError::UnsupportedFormat` if its suffix is not csv, json, pickle or bin
    pub fn new(file_name: impl Into<String>, producer: P) -> Result<Self, CacheError> {
        let file_name = file_name.into();
        let format = PersistenceFormat::from_file_name(&file_name)?;
        Ok(Self {
            producer,
            file_name,
            format,
        })
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> PersistenceFormat {
        self.format
    }

    /// Runs the producer through the cache and returns its rows
    pub fn call(
        &self,
        timestamps: &TimestampSet,
        params: &P::Params,
        options: &CallOptions,
    ) -> Result<TabularDataset, PersistError<P::Error>> {
        self.call_with_outcome(timestamps, params, options)
            .map(|(data, _)| data)
    }

    /// Like [`call`](Self::call), also reporting which path was taken
    ///
    /// On a miss the returned dataset is the producer's output, not the merged
    /// cache.
    pub fn call_with_outcome(
        &self,
        timestamps: &TimestampSet,
        params: &P::Params,
        options: &CallOptions,
    ) -> Result<(TabularDataset, CacheOutcome), PersistError<P::Error>> {
        if !options.enable_cache {
            let data = self.fetch(timestamps, params)?;
            return Ok((data, CacheOutcome::Bypass));
        }

        let file = CacheFile::resolve(options.cache_path.as_deref(), self.file_name.as_str(), self.format)?;
        file.ensure_dir()?;
        tracing::info!(path = %file.path().display(), "Path cache");

        let cached = file.read();

        if options.force_update {
            let data = self.fetch(timestamps, params)?;
            replace_and_save(&data, &file)?;
            return Ok((data, CacheOutcome::ForceFetch));
        }

        if is_fully_covered(timestamps, &cached) {
            tracing::info!(requested = timestamps.len(), "Cache with requested data");
            return Ok((cached.select(timestamps), CacheOutcome::Hit));
        }

        tracing::info!(
            requested = timestamps.len(),
            missing = missing_timestamps(timestamps, &cached).len(),
            "Fetching from producer"
        );
        let fresh = self.fetch(timestamps, params)?;
        let written = merge_and_save(&fresh, &cached, &file)?.is_some();
        Ok((fresh, CacheOutcome::Miss { written }))
    }

    fn fetch(
        &self,
        timestamps: &TimestampSet,
        params: &P::Params,
    ) -> Result<TabularDataset, PersistError<P::Error>> {
        self.producer
            .produce(timestamps, params)
            .map_err(PersistError::Producer)
    }
}

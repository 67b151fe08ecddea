//! Cache file location and lenient reads
//!
//! Provides a `CacheFile` that ties a directory, a file name and a
//! [`PersistenceFormat`] together. Reads never fail: a missing or unreadable
//! file is reported as an empty dataset so a broken cache degrades into a miss.

use super::format::{CacheError, PersistenceFormat};
use crate::data::TabularDataset;
use std::fs;
use std::path::{Path, PathBuf};

/// A single cache file at `dir/file_name`
///
/// No dataset is held in memory between calls; every [`read`](Self::read) goes
/// back to disk so the file is the only source of truth.
#[derive(Debug, Clone)]
pub struct CacheFile {
    /// Directory the cache file lives in
    dir: PathBuf,
    /// File name including the format suffix
    file_name: String,
    format: PersistenceFormat,
}

impl CacheFile {
    /// Creates a CacheFile in a specific directory
    pub fn new(dir: PathBuf, file_name: impl Into<String>, format: PersistenceFormat) -> Self {
        Self {
            dir,
            file_name: file_name.into(),
            format,
        }
    }

    /// Creates a CacheFile, defaulting the directory to the working directory
    ///
    /// A relative `dir` is resolved against the working directory as well.
    pub fn resolve(
        dir: Option<&Path>,
        file_name: impl Into<String>,
        format: PersistenceFormat,
    ) -> Result<Self, CacheError> {
        let cwd = std::env::current_dir()?;
        let dir = match dir {
            Some(d) if d.is_absolute() => d.to_path_buf(),
            Some(d) => cwd.join(d),
            None => cwd,
        };
        Ok(Self::new(dir, file_name, format))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the cache file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Ensures the cache directory exists
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Reads the cached dataset
    ///
    /// Returns an empty dataset if the file doesn't exist or cannot be parsed.
    pub fn read(&self) -> TabularDataset {
        let path = self.path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Cache empty");
            return TabularDataset::empty();
        }
        match self.format.load(&path) {
            Ok(data) => {
                tracing::debug!(path = %path.display(), rows = data.len(), "Reading cache");
                data
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable cache treated as empty");
                TabularDataset::empty()
            }
        }
    }

    /// Writes `data` as the entire cache content
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation or encoding fails
    pub fn write(&self, data: &TabularDataset) -> Result<(), CacheError> {
        self.ensure_dir()?;
        self.format.save(data, &self.path())
    }
}

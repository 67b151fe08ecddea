//! Command-line interface parsing for tscache
//!
//! This module maps clap arguments onto a [`RunConfig`]: the cache file to use,
//! the timestamps to request, and the per-call [`CallOptions`].

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::{CacheError, PersistenceFormat};
use crate::data::TimestampSet;
use crate::persist::CallOptions;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The start date could not be parsed
    #[error("Invalid start date: '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The cache file name has no supported suffix
    #[error("Invalid cache file: {0}")]
    InvalidCacheFile(#[from] CacheError),
}

/// tscache - run a timestamp producer through an on-disk cache
#[derive(Parser, Debug)]
#[command(name = "tscache")]
#[command(about = "Fetch a daily calendar series through a transparent on-disk cache")]
#[command(version)]
pub struct Cli {
    /// First day of the requested range (YYYY-MM-DD)
    #[arg(long, default_value = "2016-12-01")]
    pub start: String,

    /// Number of consecutive days to request
    #[arg(long, default_value_t = 5)]
    pub periods: usize,

    /// Cache file name; its suffix picks the format (csv, json, pickle, bin)
    #[arg(long, default_value = "example_cache.json")]
    pub file: String,

    /// Read from and write to the cache
    #[arg(long)]
    pub enable_cache: bool,

    /// Directory holding the cache file (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<PathBuf>,

    /// Rebuild the cache from this request, discarding what it held
    #[arg(long)]
    pub update_cache: bool,
}

/// Configuration derived from CLI arguments for a single cached call
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub file_name: String,
    pub timestamps: TimestampSet,
    pub options: CallOptions,
}

/// Parses a `YYYY-MM-DD` start date argument
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// The cache file suffix is checked here so an unsupported format fails
    /// before anything is fetched.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let start = parse_date_arg(&cli.start)?;
        PersistenceFormat::from_file_name(&cli.file)?;

        Ok(RunConfig {
            file_name: cli.file.clone(),
            timestamps: TimestampSet::daily(start, cli.periods),
            options: CallOptions {
                enable_cache: cli.enable_cache,
                cache_path: cli.cache_path.clone(),
                force_update: cli.update_cache,
            },
        })
    }
}

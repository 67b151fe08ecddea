//! tscache - fetch a timestamp series through a transparent on-disk cache
//!
//! Runs the built-in calendar producer for a range of days and prints the
//! returned rows as CSV. Cache decisions are logged to stderr.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tscache::cache::write_csv;
use tscache::cli::{Cli, RunConfig};
use tscache::data::CalendarProducer;
use tscache::persist::PersistTimeseries;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one cached request and prints the returned rows
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RunConfig::from_cli(&cli)?;

    let cached = PersistTimeseries::new(config.file_name.as_str(), CalendarProducer::new())?;
    let (data, outcome) = cached.call_with_outcome(&config.timestamps, &(), &config.options)?;

    info!(
        file = cached.file_name(),
        format = ?cached.format(),
        %outcome,
        rows = data.len(),
        producer_calls = cached.producer().calls(),
        "Request served"
    );

    write_csv(&data, io::stdout().lock())?;
    Ok(())
}

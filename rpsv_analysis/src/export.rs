//! Flat CSV export of the run statistics
//!
//! Serializes the same statistics the textual report prints, one
//! `Metric,Protocol,Value` row each, values rounded to two decimals so
//! the CSV and the report always agree. Rows whose backing metric has
//! no data are omitted, mirroring the report's section omission.

use std::{fs, path::Path};

use crate::aggregate::SampleCollection;

/// Errors produced by the CSV export
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper around [`csv::Error`].
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Wrapper around [`std::io::Error`].
    #[error("Failed to create CSV file: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the statistics rows for one run to `writer`.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn write_csv<W: std::io::Write>(
    tcp: &SampleCollection,
    rpsv: &SampleCollection,
    writer: W,
) -> Result<(), Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["Metric", "Protocol", "Value"])?;

    let mut row = |metric: &str, protocol: &str, value: f64| -> Result<(), csv::Error> {
        csv_writer.write_record([metric, protocol, &format!("{value:.2}")])
    };

    if let Some(stats) = tcp.latency_stats() {
        row("Latency Mean", "TCP", stats.mean)?;
        row("Latency StdDev", "TCP", stats.stddev)?;
        row("Latency P95", "TCP", stats.p95)?;
    }
    if let Some(stats) = tcp.jitter_stats() {
        row("Inter-arrival StdDev", "TCP", stats.stddev)?;
        row("Inter-arrival Variance", "TCP", stats.variance)?;
    }
    if let Some(stats) = rpsv.jitter_stats() {
        row("Inter-playback StdDev", "RPSV", stats.stddev)?;
        row("Inter-playback Variance", "RPSV", stats.variance)?;
    }
    if let Some(stats) = rpsv.playback_error_stats() {
        row("Playback Error Mean", "RPSV", stats.mean)?;
        row("Playback Error P95", "RPSV", stats.p95)?;
    }
    if let Some(stats) = rpsv.latency_stats() {
        row("RTC RTT Mean", "RPSV", stats.mean)?;
        row("RTC RTT P95", "RPSV", stats.p95)?;
    }

    Ok(())
}

/// Write the statistics rows for one run to the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_to_path(
    tcp: &SampleCollection,
    rpsv: &SampleCollection,
    path: &Path,
) -> Result<(), Error> {
    let file = fs::File::create(path)?;
    write_csv(tcp, rpsv, file)
}

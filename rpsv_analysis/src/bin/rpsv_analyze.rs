use std::path::{Path, PathBuf};

use clap::Parser;
use rpsv_analysis::{aggregate::Aggregator, export, report};
use rpsv_capture::{
    encoding,
    event::{MetricEvent, MetricKind},
    extract::LineExtractor,
    snapshot,
};
use tracing::{info, warn};
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Analyze TCP vs RPSV protocol performance", long_about = None)]
struct Args {
    /// Path to server log file
    #[clap(long)]
    log: Option<PathBuf>,

    /// Path to dev-stats JSON file or directory
    #[clap(long)]
    dev_stats: Option<PathBuf>,

    /// Output plot filename
    #[clap(long, default_value = "rpsv_analysis.png")]
    output: PathBuf,

    /// Export CSV results to analysis_results.csv
    #[clap(long)]
    csv: bool,
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("CSV export failed: {0}")]
    Export(#[from] export::Error),
}

/// Log how many samples of each kind came out of the log file.
fn log_extraction_tallies(events: &[MetricEvent]) {
    let count = |kind: MetricKind| events.iter().filter(|e| e.kind == kind).count();
    info!("Extracted metrics from log:");
    info!("  TCP latencies: {} samples", count(MetricKind::Latency));
    info!(
        "  TCP inter-arrival timestamps: {} samples",
        count(MetricKind::ArrivalTimestamp)
    );
    info!(
        "  RPSV playback errors: {} samples",
        count(MetricKind::PlaybackError)
    );
    info!(
        "  RPSV inter-playback: {} samples",
        count(MetricKind::InterPlayback)
    );
    info!(
        "  RPSV buffer sizes: {} samples",
        count(MetricKind::BufferSize)
    );
    info!("  RPSV RTC RTTs: {} samples", count(MetricKind::Rtt));
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().with_ansi(false).finish().init();

    let args = Args::parse();
    let mut aggregator = Aggregator::new();

    if let Some(log_path) = &args.log {
        info!("Parsing log file: {}", log_path.display());
        match encoding::read_lines(log_path) {
            Ok(lines) => {
                let mut extractor = LineExtractor::new();
                let events = extractor.extract_lines(lines.iter().map(String::as_str));
                let diagnostics = extractor.diagnostics();
                info!(
                    "Found {} METRIC lines, {} 'WS lane' lines, {} 'RPSV Debug' lines",
                    diagnostics.tagged_lines,
                    diagnostics.ws_lane_lines,
                    diagnostics.rpsv_debug_lines
                );
                if diagnostics.tagged_parse_failures > 0 {
                    warn!(
                        "{} METRIC lines failed to parse",
                        diagnostics.tagged_parse_failures
                    );
                }
                log_extraction_tallies(&events);
                for event in events {
                    aggregator.record(event);
                }
            }
            Err(error) => {
                warn!(
                    "Skipping log file {}: {error}",
                    log_path.display()
                );
            }
        }
    }

    if let Some(stats_path) = &args.dev_stats {
        info!("Parsing dev stats: {}", stats_path.display());
        match snapshot::load(stats_path) {
            Ok(batch) => {
                if batch.skipped_files > 0 {
                    warn!("{} snapshot file(s) skipped as unparseable", batch.skipped_files);
                }
                info!("Loaded {} snapshot(s)", batch.snapshots.len());
                for snapshot in &batch.snapshots {
                    aggregator.record_snapshot(snapshot);
                }
            }
            Err(error) => {
                warn!("Skipping dev stats {}: {error}", stats_path.display());
            }
        }
    }

    let (tcp, rpsv) = aggregator.finish();

    if tcp.is_empty() && rpsv.is_empty() {
        warn!("No data extracted from inputs!");
        warn!("Make sure:");
        warn!("  1. The server was run with RPSV_DEBUG=1");
        warn!("  2. Both TCP and RPSV modes were tested");
        warn!("  3. The log contains 'WS lane' (TCP) and 'RPSV Debug' (RPSV) entries");
        return Ok(());
    }

    if tcp.latency_samples.is_empty() {
        warn!("No TCP data found - only tested RPSV mode?");
    } else {
        info!(
            "TCP data found: {} latency samples",
            tcp.latency_samples.len()
        );
    }
    if rpsv.playback_errors.is_empty() {
        warn!("No RPSV data found - only tested TCP mode?");
    } else {
        info!(
            "RPSV data found: {} playback errors, {} inter-playback intervals",
            rpsv.playback_errors.len(),
            rpsv.inter_playback_times.len()
        );
    }

    println!("{}", report::render(&tcp, &rpsv));

    render_charts(&tcp, &rpsv, &args.output);

    if args.csv {
        let csv_path = Path::new("analysis_results.csv");
        export::export_to_path(&tcp, &rpsv, csv_path)?;
        info!("Exported CSV to: {}", csv_path.display());
    }

    info!("Analysis complete");
    Ok(())
}

#[cfg(feature = "charts")]
fn render_charts(
    tcp: &rpsv_analysis::aggregate::SampleCollection,
    rpsv: &rpsv_analysis::aggregate::SampleCollection,
    output: &Path,
) {
    use rpsv_analysis::charts;
    match charts::render(tcp, rpsv, output) {
        Ok(()) => info!("Saved plots to: {}", output.display()),
        Err(error) => warn!("Chart rendering failed: {error}"),
    }
}

#[cfg(not(feature = "charts"))]
fn render_charts(
    _tcp: &rpsv_analysis::aggregate::SampleCollection,
    _rpsv: &rpsv_analysis::aggregate::SampleCollection,
    _output: &Path,
) {
    warn!("Chart support not compiled in, skipping plot output");
}

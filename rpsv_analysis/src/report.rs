//! Textual comparison report
//!
//! Renders to a `String` in a fixed section order so two runs over the
//! same inputs produce byte-identical output: TCP statistics, RPSV
//! statistics, then the comparison deltas. Sections whose backing
//! collection is empty are omitted entirely, never printed as zeros.
//! All values are formatted to two decimals, the same rounding the CSV
//! export applies.

use std::fmt::Write;

use crate::{aggregate::SampleCollection, stats::PLAYBACK_ERROR_TARGET_MS};

/// Render the full comparison report for one run.
#[must_use]
pub fn render(tcp: &SampleCollection, rpsv: &SampleCollection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "ANALYSIS RESULTS");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let _ = writeln!(out, "\n[TCP] WebSocket Immediate Mode:");
    if let Some(latency) = tcp.latency_stats() {
        let _ = writeln!(
            out,
            "  Latency: mean={:.2}ms, median={:.2}ms",
            latency.mean, latency.median
        );
        let _ = writeln!(
            out,
            "           stddev={:.2}ms, p95={:.2}ms",
            latency.stddev, latency.p95
        );
        let _ = writeln!(
            out,
            "           range=[{:.2}, {:.2}]ms",
            latency.min, latency.max
        );
    }
    if let Some(jitter) = tcp.jitter_stats() {
        let _ = writeln!(out, "  Inter-arrival jitter: mean={:.2}ms", jitter.mean);
        let _ = writeln!(out, "                       stddev={:.2}ms", jitter.stddev);
        let _ = writeln!(
            out,
            "                       variance={:.2}ms^2",
            jitter.variance
        );
    }

    let _ = writeln!(out, "\n[RPSV] RTC + Adaptive Buffer Mode:");
    if let Some(latency) = rpsv.latency_stats() {
        let _ = writeln!(
            out,
            "  Latency: mean={:.2}ms, median={:.2}ms",
            latency.mean, latency.median
        );
        let _ = writeln!(
            out,
            "           stddev={:.2}ms, p95={:.2}ms",
            latency.stddev, latency.p95
        );
    }
    if let Some(jitter) = rpsv.jitter_stats() {
        let _ = writeln!(out, "  Inter-playback jitter: mean={:.2}ms", jitter.mean);
        let _ = writeln!(out, "                        stddev={:.2}ms", jitter.stddev);
        let _ = writeln!(
            out,
            "                        variance={:.2}ms^2",
            jitter.variance
        );
    }
    if let Some(error) = rpsv.playback_error_stats() {
        let _ = writeln!(
            out,
            "  Playback error: mean={:.2}ms, median={:.2}ms",
            error.mean, error.median
        );
        let _ = writeln!(
            out,
            "                  max={:.2}ms, p95={:.2}ms",
            error.max, error.p95
        );
    }
    if let Some(buffer) = rpsv.buffer_stats() {
        let _ = writeln!(
            out,
            "  Buffer size: mean={:.2}ms, range=[{:.2}, {:.2}]ms",
            buffer.mean, buffer.min, buffer.max
        );
    }

    let _ = writeln!(out, "\n[COMPARISON]");
    if let (Some(tcp_jitter), Some(rpsv_jitter)) = (tcp.jitter_stats(), rpsv.jitter_stats()) {
        let delta = rpsv_jitter.stddev - tcp_jitter.stddev;
        let _ = writeln!(
            out,
            "  Timing variability (stddev): TCP={:.2}ms vs RPSV={:.2}ms (Delta {:+.2}ms)",
            tcp_jitter.stddev, rpsv_jitter.stddev, delta
        );
    }
    if let (Some(tcp_latency), Some(rpsv_latency)) = (tcp.latency_stats(), rpsv.latency_stats()) {
        let overhead = rpsv_latency.mean - tcp_latency.mean;
        let _ = writeln!(
            out,
            "  Latency: TCP mean={:.2}ms vs RPSV RTT mean={:.2}ms (Delta {:+.2}ms)",
            tcp_latency.mean, rpsv_latency.mean, overhead
        );
    }
    if let Some(error) = rpsv.playback_error_stats() {
        let _ = writeln!(
            out,
            "  Playback accuracy: {:.2}ms avg error (target: <{PLAYBACK_ERROR_TARGET_MS:.0}ms)",
            error.mean
        );
    }

    out
}

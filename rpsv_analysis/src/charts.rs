//! Chart rendering for the protocol comparison
//!
//! Draws a fixed 2×2 grid into one PNG: latency histograms, the first
//! hundred timing intervals against the metronome target, the RPSV
//! playback-error distribution against the accuracy target, and the
//! adaptive buffer's evolution. Panels with no backing data draw a
//! placeholder note instead of failing the whole render. Everything
//! here consumes finished sample collections; no extraction logic.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{aggregate::SampleCollection, stats::PLAYBACK_ERROR_TARGET_MS};

/// Histogram resolution for the distribution panels.
const HISTOGRAM_BINS: usize = 30;
/// Metronome interval the timing panel draws as its reference line.
const TARGET_INTERVAL_MS: f64 = 500.0;
/// Interval samples shown in the timing-consistency panel.
const INTERVAL_WINDOW: usize = 100;
/// Buffer samples shown in the evolution panel.
const BUFFER_WINDOW: usize = 200;

/// Errors produced by chart rendering
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The plotting backend rejected a drawing operation.
    #[error("Failed to render chart: {0}")]
    Draw(String),
}

fn draw_error<E: std::fmt::Display>(error: E) -> Error {
    Error::Draw(error.to_string())
}

/// Render the 2×2 comparison grid to a PNG at `path`.
///
/// # Errors
///
/// Returns an error if the image file cannot be written or a drawing
/// operation fails.
pub fn render(tcp: &SampleCollection, rpsv: &SampleCollection, path: &Path) -> Result<(), Error> {
    let root = BitMapBackend::new(path, (1400, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;
    let root = root
        .titled("TCP vs RPSV Protocol Comparison", ("sans-serif", 32))
        .map_err(draw_error)?;

    let panels = root.split_evenly((2, 2));
    draw_latency_histograms(&panels[0], tcp, rpsv)?;
    draw_interval_series(&panels[1], tcp, rpsv)?;
    draw_error_histogram(&panels[2], rpsv)?;
    draw_buffer_evolution(&panels[3], rpsv)?;

    root.present().map_err(draw_error)?;
    Ok(())
}

/// Centered placeholder for a panel with nothing to show.
fn draw_placeholder<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    message: &str,
) -> Result<(), Error> {
    let (width, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_owned(),
        (width as i32 / 2 - 60, height as i32 / 2),
        ("sans-serif", 20),
    ))
    .map_err(draw_error)?;
    Ok(())
}

/// Fixed-width binning over the closed `[lo, hi]` value range.
fn bin_counts(values: &[f64], lo: f64, hi: f64) -> Vec<u32> {
    let width = bin_width(lo, hi);
    let mut counts = vec![0_u32; HISTOGRAM_BINS];
    for value in values {
        let bin = ((value - lo) / width).floor() as usize;
        counts[bin.min(HISTOGRAM_BINS - 1)] += 1;
    }
    counts
}

fn bin_width(lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    if span > 0.0 {
        span / HISTOGRAM_BINS as f64
    } else {
        // Degenerate distribution, a single shared value. Any positive
        // width puts everything in the first bin.
        1.0
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut bounds: Option<(f64, f64)> = None;
    for value in values {
        bounds = Some(match bounds {
            None => (value, value),
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
        });
    }
    bounds
}

fn draw_latency_histograms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    tcp: &SampleCollection,
    rpsv: &SampleCollection,
) -> Result<(), Error> {
    let tcp_values = tcp.latency_values();
    let rpsv_values = rpsv.latency_values();
    let Some((lo, hi)) = min_max(tcp_values.iter().chain(rpsv_values.iter()).copied()) else {
        return draw_placeholder(area, "No latency data");
    };

    let width = bin_width(lo, hi);
    let series: Vec<(&str, Vec<u32>, RGBColor)> = [
        ("TCP", &tcp_values, BLUE),
        ("RPSV", &rpsv_values, GREEN),
    ]
    .into_iter()
    .filter(|(_, values, _)| !values.is_empty())
    .map(|(label, values, color)| (label, bin_counts(values, lo, hi), color))
    .collect();
    let y_max = series
        .iter()
        .flat_map(|(_, counts, _)| counts.iter().copied())
        .max()
        .unwrap_or(1);

    let mut chart = ChartBuilder::on(area)
        .caption("Latency Distribution", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..lo + width * HISTOGRAM_BINS as f64, 0_u32..y_max + 1)
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_desc("Latency (ms)")
        .y_desc("Frequency")
        .draw()
        .map_err(draw_error)?;

    for (label, counts, color) in series {
        chart
            .draw_series(counts.iter().enumerate().map(|(i, count)| {
                let x0 = lo + width * i as f64;
                Rectangle::new([(x0, 0), (x0 + width, *count)], color.mix(0.6).filled())
            }))
            .map_err(draw_error)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .draw()
        .map_err(draw_error)?;
    Ok(())
}

fn draw_interval_series<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    tcp: &SampleCollection,
    rpsv: &SampleCollection,
) -> Result<(), Error> {
    let tcp_window: Vec<f64> = tcp
        .inter_arrival_times
        .iter()
        .take(INTERVAL_WINDOW)
        .copied()
        .collect();
    let rpsv_window: Vec<f64> = rpsv
        .inter_playback_times
        .iter()
        .take(INTERVAL_WINDOW)
        .copied()
        .collect();
    if tcp_window.is_empty() && rpsv_window.is_empty() {
        return draw_placeholder(area, "No timing data");
    }

    let longest = tcp_window.len().max(rpsv_window.len());
    let y_top = min_max(tcp_window.iter().chain(rpsv_window.iter()).copied())
        .map_or(TARGET_INTERVAL_MS, |(_, hi)| hi)
        .max(TARGET_INTERVAL_MS)
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("Timing Consistency (first {INTERVAL_WINDOW} events)"),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0_f64..longest as f64, 0_f64..y_top)
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_desc("Event Index")
        .y_desc("Time Interval (ms)")
        .draw()
        .map_err(draw_error)?;

    let series: [(&str, &[f64], RGBColor); 2] = [
        ("TCP Inter-arrival", &tcp_window, BLUE),
        ("RPSV Inter-playback", &rpsv_window, GREEN),
    ];
    for (label, window, color) in series {
        if window.is_empty() {
            continue;
        }
        chart
            .draw_series(LineSeries::new(
                window.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                color.mix(0.6),
            ))
            .map_err(draw_error)?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 15, y)], color)
            });
    }
    chart
        .draw_series(LineSeries::new(
            [
                (0.0, TARGET_INTERVAL_MS),
                (longest as f64, TARGET_INTERVAL_MS),
            ],
            RED.mix(0.5),
        ))
        .map_err(draw_error)?
        .label(format!("Target ({TARGET_INTERVAL_MS:.0}ms)"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], RED));
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .draw()
        .map_err(draw_error)?;
    Ok(())
}

fn draw_error_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rpsv: &SampleCollection,
) -> Result<(), Error> {
    let magnitudes: Vec<f64> = rpsv.playback_errors.iter().map(|e| e.abs()).collect();
    let Some((lo, hi)) = min_max(magnitudes.iter().copied()) else {
        return draw_placeholder(area, "No playback error data");
    };

    let width = bin_width(lo, hi);
    let counts = bin_counts(&magnitudes, lo, hi);
    let y_max = counts.iter().copied().max().unwrap_or(1);
    let x_top = (lo + width * HISTOGRAM_BINS as f64).max(PLAYBACK_ERROR_TARGET_MS * 1.2);

    let mut chart = ChartBuilder::on(area)
        .caption("RPSV Playback Accuracy", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo.min(0.0)..x_top, 0_u32..y_max + 1)
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_desc("Playback Error (ms)")
        .y_desc("Frequency")
        .draw()
        .map_err(draw_error)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, count)| {
            let x0 = lo + width * i as f64;
            Rectangle::new([(x0, 0), (x0 + width, *count)], GREEN.mix(0.7).filled())
        }))
        .map_err(draw_error)?;
    chart
        .draw_series(LineSeries::new(
            [
                (PLAYBACK_ERROR_TARGET_MS, 0),
                (PLAYBACK_ERROR_TARGET_MS, y_max + 1),
            ],
            RED.mix(0.7),
        ))
        .map_err(draw_error)?
        .label(format!("Target (<{PLAYBACK_ERROR_TARGET_MS:.0}ms)"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], RED));
    chart
        .configure_series_labels()
        .border_style(BLACK)
        .draw()
        .map_err(draw_error)?;
    Ok(())
}

fn draw_buffer_evolution<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rpsv: &SampleCollection,
) -> Result<(), Error> {
    let window: Vec<f64> = rpsv
        .buffer_sizes
        .iter()
        .take(BUFFER_WINDOW)
        .map(|s| s.value)
        .collect();
    if window.is_empty() {
        return draw_placeholder(area, "No buffer data");
    }

    let y_top = min_max(window.iter().copied()).map_or(1.0, |(_, hi)| hi) * 1.1;
    let mut chart = ChartBuilder::on(area)
        .caption("Adaptive Buffer Size Evolution", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0_f64..window.len() as f64, 0_f64..y_top)
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_desc("Time (samples)")
        .y_desc("Buffer Size (ms)")
        .draw()
        .map_err(draw_error)?;
    chart
        .draw_series(LineSeries::new(
            window.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            GREEN.mix(0.8),
        ))
        .map_err(draw_error)?;
    Ok(())
}

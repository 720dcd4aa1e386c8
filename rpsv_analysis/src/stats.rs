//! Descriptive statistics over metric sample sequences
//!
//! Everything here recomputes from the raw samples on each call, no
//! caching. Empty input is a `None` summary, never an error, and a
//! single sample has zero spread rather than a division by zero.

use average::{concatenate, Estimate, Max, Min, Variance};

use crate::aggregate::SampleCollection;

concatenate!(
    Estimator,
    [Variance, variance, mean, sample_variance],
    [Min, min, min],
    [Max, max, max]
);

/// Playback accuracy target, milliseconds. Mean absolute playback
/// error at or under this is considered inaudible.
pub const PLAYBACK_ERROR_TARGET_MS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Descriptive statistics of one non-empty sample sequence.
pub struct Summary {
    /// Number of samples.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Interpolated 50th percentile.
    pub median: f64,
    /// Sample standard deviation, 0 below two samples.
    pub stddev: f64,
    /// Sample variance, 0 below two samples.
    pub variance: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How percentiles are computed.
pub enum Percentile {
    /// Linear interpolation between the two nearest ranks on a sorted
    /// copy. The preferred method.
    #[default]
    Interpolated,
    /// Nearest rank on a sorted copy: index `floor(fraction × count)`
    /// clamped into bounds, 0 for an empty sequence. A coarser
    /// approximation kept bit-for-bit stable for reproducibility
    /// where the interpolated path is not wanted.
    NearestRank,
}

/// Compute the percentile at `fraction` (0.0..=1.0) of `values`.
///
/// Returns 0.0 for an empty sequence under either method.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile(values: &[f64], fraction: f64, method: Percentile) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    match method {
        Percentile::Interpolated => {
            let rank = fraction * (sorted.len() - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let weight = rank - lo as f64;
                sorted[lo] * (1.0 - weight) + sorted[hi] * weight
            }
        }
        Percentile::NearestRank => {
            let index = (fraction * sorted.len() as f64).floor() as usize;
            sorted[index.min(sorted.len() - 1)]
        }
    }
}

/// Summarize `values` with interpolated percentiles.
#[must_use]
pub fn summarize(values: &[f64]) -> Option<Summary> {
    summarize_with(values, Percentile::default())
}

/// Summarize `values`, computing p95/p99/median with `method`.
///
/// `None` when `values` is empty.
#[must_use]
pub fn summarize_with(values: &[f64], method: Percentile) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let estimator: Estimator = values.iter().copied().collect();
    let variance = if values.len() < 2 {
        0.0
    } else {
        estimator.sample_variance()
    };
    Some(Summary {
        count: values.len(),
        mean: estimator.mean(),
        median: percentile(values, 0.50, method),
        stddev: variance.sqrt(),
        variance,
        min: estimator.min(),
        max: estimator.max(),
        p95: percentile(values, 0.95, method),
        p99: percentile(values, 0.99, method),
    })
}

impl SampleCollection {
    /// Latency statistics, `None` when no latency samples exist.
    #[must_use]
    pub fn latency_stats(&self) -> Option<Summary> {
        summarize(&self.latency_values())
    }

    /// Jitter statistics over the timing-interval sequence.
    ///
    /// Inter-playback intervals are preferred when present, otherwise
    /// the derived inter-arrival intervals. Fewer than two intervals
    /// is no jitter at all, `None`.
    #[must_use]
    pub fn jitter_stats(&self) -> Option<Summary> {
        let intervals = if self.inter_playback_times.is_empty() {
            &self.inter_arrival_times
        } else {
            &self.inter_playback_times
        };
        if intervals.len() < 2 {
            return None;
        }
        summarize(intervals)
    }

    /// Playback accuracy statistics over absolute error magnitudes.
    ///
    /// Direction of the error is discarded here; the raw signed
    /// samples stay available on the collection.
    #[must_use]
    pub fn playback_error_stats(&self) -> Option<Summary> {
        let magnitudes: Vec<f64> = self.playback_errors.iter().map(|e| e.abs()).collect();
        summarize(&magnitudes)
    }

    /// Buffer size statistics, `None` when no buffer samples exist.
    #[must_use]
    pub fn buffer_stats(&self) -> Option<Summary> {
        summarize(&self.buffer_values())
    }
}

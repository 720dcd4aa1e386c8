//! Canonical representation of one extracted timing observation
//!
//! This module defines the core data structures for representing a
//! single metric observation. These structures are source-agnostic:
//! the log extractor and the snapshot loader both emit them and the
//! aggregation layer downstream consumes them exactly once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// The transport a [`MetricEvent`] belongs to.
pub enum Protocol {
    /// WebSocket immediate-send mode, the baseline transport.
    Tcp,
    /// RTC plus adaptive client-side playback buffer.
    Rpsv,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Rpsv => write!(f, "RPSV"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// The kinds of observations recorded in a [`MetricEvent`].
pub enum MetricKind {
    /// One-way delivery latency, milliseconds.
    Latency,
    /// Wall-clock arrival timestamp of a TCP event. Inter-arrival
    /// intervals are derived from consecutive pairs of these, they are
    /// not a metric on their own.
    ArrivalTimestamp,
    /// Signed deviation between intended and actual playback time,
    /// milliseconds. Negative means early.
    PlaybackError,
    /// Interval between consecutive playback events, milliseconds.
    InterPlayback,
    /// Adaptive playback buffer size, milliseconds.
    BufferSize,
    /// Round-trip time on the RTC channel, milliseconds. Serves as the
    /// RPSV latency proxy downstream.
    Rtt,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
/// A single extracted observation.
///
/// Immutable once produced. `at` is whatever positional information
/// the source had: a sample index for log-extracted values, the
/// snapshot `serverTime` for snapshot-extracted values.
pub struct MetricEvent {
    /// The transport this observation belongs to.
    pub protocol: Protocol,
    /// What was observed.
    pub kind: MetricKind,
    /// The observed value, milliseconds except for `ArrivalTimestamp`.
    pub value: f64,
    /// Sample index or source timestamp, depending on origin.
    pub at: f64,
}

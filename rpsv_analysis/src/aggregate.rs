//! Folding of extracted events and snapshots into per-protocol samples
//!
//! The extraction layer hands over a flat [`MetricEvent`] stream; this
//! module sorts it into one [`SampleCollection`] per protocol. All
//! sequences are append-only for the duration of a run and preserve
//! source order, since the "first N events" chart windows depend on
//! it. TCP inter-arrival intervals are the one derived sequence: they
//! come from consecutive differences of sorted arrival timestamps at
//! [`Aggregator::finish`] time.

use rpsv_capture::{
    event::{MetricEvent, MetricKind, Protocol},
    snapshot::Snapshot,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// One indexed observation: `at` is a sample index or the source
/// timestamp, depending on where the value came from.
pub struct Sample {
    /// Sample index or source timestamp.
    pub at: f64,
    /// Observed value, milliseconds.
    pub value: f64,
}

#[derive(Debug, Clone)]
/// Every sample sequence collected for one protocol during a run.
pub struct SampleCollection {
    /// The protocol all contained samples belong to.
    pub protocol: Protocol,
    /// One-way latency observations (for RPSV, RTT proxies and
    /// snapshot latency history).
    pub latency_samples: Vec<Sample>,
    /// Derived TCP inter-arrival intervals, milliseconds.
    pub inter_arrival_times: Vec<f64>,
    /// RPSV inter-playback intervals, milliseconds.
    pub inter_playback_times: Vec<f64>,
    /// Signed playback errors, milliseconds.
    pub playback_errors: Vec<f64>,
    /// Adaptive buffer size observations, milliseconds.
    pub buffer_sizes: Vec<Sample>,
}

impl SampleCollection {
    /// An empty collection for `protocol`.
    #[must_use]
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            latency_samples: Vec::new(),
            inter_arrival_times: Vec::new(),
            inter_playback_times: Vec::new(),
            playback_errors: Vec::new(),
            buffer_sizes: Vec::new(),
        }
    }

    /// True when no sequence holds any sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latency_samples.is_empty()
            && self.inter_arrival_times.is_empty()
            && self.inter_playback_times.is_empty()
            && self.playback_errors.is_empty()
            && self.buffer_sizes.is_empty()
    }

    /// Latency values without their positional tags.
    #[must_use]
    pub fn latency_values(&self) -> Vec<f64> {
        self.latency_samples.iter().map(|s| s.value).collect()
    }

    /// Buffer size values without their positional tags.
    #[must_use]
    pub fn buffer_values(&self) -> Vec<f64> {
        self.buffer_sizes.iter().map(|s| s.value).collect()
    }
}

#[derive(Debug)]
/// Accumulates events and snapshots, producing the two per-protocol
/// collections on [`Aggregator::finish`].
pub struct Aggregator {
    tcp: SampleCollection,
    rpsv: SampleCollection,
    tcp_timestamps: Vec<f64>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Create an empty [`Aggregator`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            tcp: SampleCollection::new(Protocol::Tcp),
            rpsv: SampleCollection::new(Protocol::Rpsv),
            tcp_timestamps: Vec::new(),
        }
    }

    /// Fold one extracted event into the run state.
    pub fn record(&mut self, event: MetricEvent) {
        let sample = Sample {
            at: event.at,
            value: event.value,
        };
        match event.kind {
            MetricKind::Latency => {
                let collection = match event.protocol {
                    Protocol::Tcp => &mut self.tcp,
                    Protocol::Rpsv => &mut self.rpsv,
                };
                collection.latency_samples.push(sample);
            }
            // Timestamps are raw material for the inter-arrival
            // derivation at finish time, not samples themselves.
            MetricKind::ArrivalTimestamp => self.tcp_timestamps.push(event.value),
            MetricKind::PlaybackError => self.rpsv.playback_errors.push(event.value),
            MetricKind::InterPlayback => self.rpsv.inter_playback_times.push(event.value),
            MetricKind::BufferSize => self.rpsv.buffer_sizes.push(sample),
            // RTT over the RTC channel is the closest thing RPSV has
            // to a latency figure, so it lands in the latency series.
            MetricKind::Rtt => self.rpsv.latency_samples.push(sample),
        }
    }

    /// Fold every client's history from one snapshot, each sample
    /// tagged with the snapshot's server time.
    pub fn record_snapshot(&mut self, snapshot: &Snapshot) {
        let server_time = snapshot.server_time.unwrap_or(0.0);
        for client in snapshot.clients.iter().flatten() {
            for latency in client.latency_history.iter().flatten() {
                self.rpsv.latency_samples.push(Sample {
                    at: server_time,
                    value: *latency,
                });
            }
            if let Some(buffer) = client.buffer_size_ms {
                self.rpsv.buffer_sizes.push(Sample {
                    at: server_time,
                    value: buffer,
                });
            }
        }
    }

    /// Derive TCP inter-arrival intervals and hand out the final
    /// `(tcp, rpsv)` collections.
    ///
    /// Timestamps are sorted ascending before differencing; only
    /// strictly positive gaps survive, so duplicate or out-of-order
    /// timestamps drop out rather than poisoning the jitter figures.
    #[must_use]
    pub fn finish(mut self) -> (SampleCollection, SampleCollection) {
        self.tcp_timestamps.sort_by(f64::total_cmp);
        for pair in self.tcp_timestamps.windows(2) {
            let dt = pair[1] - pair[0];
            if dt > 0.0 {
                self.tcp.inter_arrival_times.push(dt);
            }
        }
        (self.tcp, self.rpsv)
    }
}

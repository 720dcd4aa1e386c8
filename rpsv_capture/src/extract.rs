//! Extraction of metric events from raw log lines
//!
//! Each line is run through a fixed-priority rule chain: one
//! structured rule for `METRIC `-tagged JSON payloads and a handful of
//! free-text rules for the debug formats the producer emits when
//! structured tagging is off. A line may yield several events of
//! different kinds (a playback error and its inter-playback interval
//! travel on the same line) but never two events of the same kind, and
//! never an error: anything unparseable degrades to "no event" plus a
//! diagnostic count.

use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::event::{MetricEvent, MetricKind, Protocol};

/// Marker token opening a structured metric line.
const TAG: &str = "METRIC ";
/// Required substring for the TCP free-text latency rule.
const WS_LANE_MARKER: &str = "WS lane";
/// Required substring for all RPSV free-text rules.
const RPSV_DEBUG_MARKER: &str = "RPSV Debug";
/// Free-text buffer sizes outside this range are presumed to be the
/// client's initial default, not a real adaptation, and are dropped.
const BUFFER_RANGE: RangeInclusive<f64> = 5.0..=500.0;

static WS_LATENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"latency=(\d+(?:\.\d+)?)ms").expect("Invalid regex pattern provided"));
static PLAYBACK_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"PlaybackError=(-?\d+(?:\.\d+)?)ms").expect("Invalid regex pattern provided")
});
static INTER_PLAYBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"InterPlayback=(\d+(?:\.\d+)?)ms").expect("Invalid regex pattern provided")
});
static BUFFER_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bufferSizeMs=(\d+)").expect("Invalid regex pattern provided"));
static RTC_LATENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"RTC latency=(\d+(?:\.\d+)?)ms").expect("Invalid regex pattern provided")
});

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
/// Payload of a `METRIC `-tagged line. The `kind` discriminator
/// selects which numeric fields are meaningful; all of them are
/// optional since the producer omits fields it has no value for.
enum TaggedRecord {
    #[serde(rename = "tcp_ws", rename_all = "camelCase")]
    TcpWs {
        latency_ms: Option<f64>,
        ts: Option<f64>,
    },
    #[serde(rename = "rpsv_playback", rename_all = "camelCase")]
    RpsvPlayback {
        playback_error_ms: Option<f64>,
        inter_playback_ms: Option<f64>,
    },
    #[serde(rename = "rpsv_rtc", rename_all = "camelCase")]
    RpsvRtc {
        buffer_size_ms: Option<f64>,
        rtt_ms: Option<f64>,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Per-file match and failure counters.
///
/// An explicit collector rather than module state so callers and tests
/// can assert on exact counts. Only the first
/// [`Diagnostics::DETAIL_LIMIT`] occurrences of each failure class are
/// logged in detail, the remainder are counted silently.
pub struct Diagnostics {
    /// Lines opening with the `METRIC ` tag.
    pub tagged_lines: u64,
    /// Tagged lines whose JSON payload did not parse.
    pub tagged_parse_failures: u64,
    /// Lines carrying the `WS lane` marker.
    pub ws_lane_lines: u64,
    /// `WS lane` lines where no latency value could be extracted.
    pub ws_lane_unmatched: u64,
    /// Lines carrying the `RPSV Debug` marker.
    pub rpsv_debug_lines: u64,
}

impl Diagnostics {
    /// How many occurrences of each failure class are reported in
    /// detail before falling back to counting.
    pub const DETAIL_LIMIT: u64 = 5;
}

#[derive(Debug, Default)]
/// Converts raw log lines into [`MetricEvent`]s.
///
/// Stateful across lines of one file: it numbers the samples it emits
/// per metric kind and accumulates [`Diagnostics`].
pub struct LineExtractor {
    diagnostics: Diagnostics,
    tcp_latency_idx: u64,
    tcp_timestamp_idx: u64,
    playback_error_idx: u64,
    inter_playback_idx: u64,
    buffer_size_idx: u64,
    rtt_idx: u64,
}

impl LineExtractor {
    /// Create a new [`LineExtractor`] with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run every line through [`Self::extract_line`], in order.
    pub fn extract_lines<'a, I>(&mut self, lines: I) -> Vec<MetricEvent>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut events = Vec::new();
        for line in lines {
            self.extract_line(line, &mut events);
        }
        events
    }

    /// Extract zero or more events from one line, appending to `events`.
    ///
    /// Rule precedence: a successfully parsed tagged payload
    /// short-circuits the free-text rules so one line never counts a
    /// metric kind twice. A tagged line that fails to parse still gets
    /// the free-text treatment.
    pub fn extract_line(&mut self, line: &str, events: &mut Vec<MetricEvent>) {
        if self.apply_tagged_rule(line, events) {
            return;
        }
        self.apply_ws_lane_rule(line, events);
        if line.contains(RPSV_DEBUG_MARKER) {
            self.diagnostics.rpsv_debug_lines += 1;
            self.apply_playback_rule(line, events);
            self.apply_buffer_rule(line, events);
            // RTC latency values are recognized but unattributed: the
            // producer logs them alongside the buffer size without
            // feeding any metric. Kept as an explicit no-op so the
            // rule chain states the whole grammar.
            let _ = RTC_LATENCY_RE.captures(line);
        }
    }

    /// Returns true when the line carried a tagged payload that parsed.
    fn apply_tagged_rule(&mut self, line: &str, events: &mut Vec<MetricEvent>) -> bool {
        let Some(payload) = line.trim_start().strip_prefix(TAG) else {
            return false;
        };
        self.diagnostics.tagged_lines += 1;
        let record: TaggedRecord = match serde_json::from_str(payload.trim()) {
            Ok(record) => record,
            Err(error) => {
                self.diagnostics.tagged_parse_failures += 1;
                if self.diagnostics.tagged_parse_failures <= Diagnostics::DETAIL_LIMIT {
                    let snippet: String = line.chars().take(100).collect();
                    warn!("METRIC parse error: {error} for line: {snippet}");
                }
                return false;
            }
        };
        match record {
            TaggedRecord::TcpWs { latency_ms, ts } => {
                if let Some(latency) = latency_ms {
                    self.emit(events, Protocol::Tcp, MetricKind::Latency, latency);
                }
                if let Some(ts) = ts {
                    self.emit(events, Protocol::Tcp, MetricKind::ArrivalTimestamp, ts);
                }
            }
            TaggedRecord::RpsvPlayback {
                playback_error_ms,
                inter_playback_ms,
            } => {
                if let Some(error) = playback_error_ms {
                    self.emit(events, Protocol::Rpsv, MetricKind::PlaybackError, error);
                }
                // A zero interval means two events played in the same
                // instant, not a real cadence measurement.
                if let Some(interval) = inter_playback_ms {
                    if interval > 0.0 {
                        self.emit(events, Protocol::Rpsv, MetricKind::InterPlayback, interval);
                    }
                }
            }
            TaggedRecord::RpsvRtc {
                buffer_size_ms,
                rtt_ms,
            } => {
                if let Some(buffer) = buffer_size_ms {
                    self.emit(events, Protocol::Rpsv, MetricKind::BufferSize, buffer);
                }
                if let Some(rtt) = rtt_ms {
                    self.emit(events, Protocol::Rpsv, MetricKind::Rtt, rtt);
                }
            }
        }
        true
    }

    fn apply_ws_lane_rule(&mut self, line: &str, events: &mut Vec<MetricEvent>) {
        if !line.contains(WS_LANE_MARKER) {
            return;
        }
        self.diagnostics.ws_lane_lines += 1;
        if let Some(captures) = WS_LATENCY_RE.captures(line) {
            if let Ok(latency) = captures[1].parse::<f64>() {
                self.emit(events, Protocol::Tcp, MetricKind::Latency, latency);
                return;
            }
        }
        self.diagnostics.ws_lane_unmatched += 1;
        if self.diagnostics.ws_lane_unmatched <= Diagnostics::DETAIL_LIMIT {
            let snippet: String = line.chars().take(80).collect();
            debug!("WS lane line found but no latency match: {snippet}");
        }
    }

    fn apply_playback_rule(&mut self, line: &str, events: &mut Vec<MetricEvent>) {
        let Some(captures) = PLAYBACK_ERROR_RE.captures(line) else {
            return;
        };
        let Ok(error) = captures[1].parse::<f64>() else {
            return;
        };
        self.emit(events, Protocol::Rpsv, MetricKind::PlaybackError, error);

        if let Some(captures) = INTER_PLAYBACK_RE.captures(line) {
            if let Ok(interval) = captures[1].parse::<f64>() {
                if interval > 0.0 {
                    self.emit(events, Protocol::Rpsv, MetricKind::InterPlayback, interval);
                }
            }
        }
    }

    fn apply_buffer_rule(&mut self, line: &str, events: &mut Vec<MetricEvent>) {
        let Some(captures) = BUFFER_SIZE_RE.captures(line) else {
            return;
        };
        let Ok(buffer) = captures[1].parse::<f64>() else {
            return;
        };
        if BUFFER_RANGE.contains(&buffer) {
            self.emit(events, Protocol::Rpsv, MetricKind::BufferSize, buffer);
        }
    }

    fn emit(
        &mut self,
        events: &mut Vec<MetricEvent>,
        protocol: Protocol,
        kind: MetricKind,
        value: f64,
    ) {
        let index = match kind {
            // RPSV latency proxies arrive as Rtt, so Latency is
            // TCP-only here.
            MetricKind::Latency => &mut self.tcp_latency_idx,
            MetricKind::ArrivalTimestamp => &mut self.tcp_timestamp_idx,
            MetricKind::PlaybackError => &mut self.playback_error_idx,
            MetricKind::InterPlayback => &mut self.inter_playback_idx,
            MetricKind::BufferSize => &mut self.buffer_size_idx,
            MetricKind::Rtt => &mut self.rtt_idx,
        };
        let at = *index as f64;
        *index += 1;
        events.push(MetricEvent {
            protocol,
            kind,
            value,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(lines: &[&str]) -> (Vec<MetricEvent>, Diagnostics) {
        let mut extractor = LineExtractor::new();
        let events = extractor.extract_lines(lines.iter().copied());
        (events, *extractor.diagnostics())
    }

    #[test]
    fn tagged_tcp_ws_line_yields_latency_and_timestamp() {
        let (events, diagnostics) =
            extract(&[r#"METRIC {"kind":"tcp_ws","latencyMs":23.5,"ts":1000}"#]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].protocol, Protocol::Tcp);
        assert_eq!(events[0].kind, MetricKind::Latency);
        assert_eq!(events[0].value, 23.5);
        assert_eq!(events[1].kind, MetricKind::ArrivalTimestamp);
        assert_eq!(events[1].value, 1000.0);
        assert_eq!(diagnostics.tagged_lines, 1);
        assert_eq!(diagnostics.tagged_parse_failures, 0);
    }

    #[test]
    fn tagged_line_survives_leading_whitespace() {
        let (events, _) = extract(&[r#"   METRIC {"kind":"tcp_ws","latencyMs":7}"#]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 7.0);
    }

    #[test]
    fn tagged_rpsv_playback_filters_zero_interval() {
        let (events, _) = extract(&[
            r#"METRIC {"kind":"rpsv_playback","playbackErrorMs":-2,"interPlaybackMs":0}"#,
            r#"METRIC {"kind":"rpsv_playback","playbackErrorMs":1,"interPlaybackMs":500}"#,
        ]);
        let intervals: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == MetricKind::InterPlayback)
            .map(|e| e.value)
            .collect();
        assert_eq!(intervals, vec![500.0]);
        let errors: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == MetricKind::PlaybackError)
            .map(|e| e.value)
            .collect();
        assert_eq!(errors, vec![-2.0, 1.0]);
    }

    #[test]
    fn tagged_rpsv_rtc_yields_buffer_and_rtt() {
        let (events, _) = extract(&[r#"METRIC {"kind":"rpsv_rtc","bufferSizeMs":40,"rttMs":12.5}"#]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, MetricKind::BufferSize);
        assert_eq!(events[0].value, 40.0);
        assert_eq!(events[1].kind, MetricKind::Rtt);
        assert_eq!(events[1].value, 12.5);
        assert!(events.iter().all(|e| e.protocol == Protocol::Rpsv));
    }

    #[test]
    fn malformed_tagged_json_is_counted_not_fatal() {
        let (events, diagnostics) = extract(&[
            "METRIC {not json",
            r#"METRIC {"kind":"unknown_kind","latencyMs":3}"#,
        ]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.tagged_lines, 2);
        assert_eq!(diagnostics.tagged_parse_failures, 2);
    }

    #[test]
    fn ws_lane_free_text_latency() {
        let (events, diagnostics) = extract(&["🎯 WS lane: noteOn (latency=23ms)"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].protocol, Protocol::Tcp);
        assert_eq!(events[0].kind, MetricKind::Latency);
        assert_eq!(events[0].value, 23.0);
        assert_eq!(diagnostics.ws_lane_lines, 1);
        assert_eq!(diagnostics.ws_lane_unmatched, 0);
    }

    #[test]
    fn ws_lane_marker_without_number_is_flagged_only() {
        let (events, diagnostics) = extract(&["WS lane: connection opened"]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.ws_lane_lines, 1);
        assert_eq!(diagnostics.ws_lane_unmatched, 1);
    }

    #[test]
    fn playback_error_sign_preserved_zero_interval_dropped() {
        let (events, diagnostics) = extract(&["RPSV Debug: PlaybackError=-3ms, InterPlayback=0ms"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MetricKind::PlaybackError);
        assert_eq!(events[0].value, -3.0);
        assert_eq!(diagnostics.rpsv_debug_lines, 1);
    }

    #[test]
    fn playback_error_with_interval_yields_both_kinds() {
        let (events, _) = extract(&["RPSV Debug: PlaybackError=2ms, InterPlayback=500ms"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, MetricKind::PlaybackError);
        assert_eq!(events[0].value, 2.0);
        assert_eq!(events[1].kind, MetricKind::InterPlayback);
        assert_eq!(events[1].value, 500.0);
    }

    #[test]
    fn playback_error_requires_debug_marker() {
        let (events, _) = extract(&["PlaybackError=2ms, InterPlayback=500ms"]);
        assert!(events.is_empty());
    }

    #[test]
    fn buffer_size_outside_plausible_range_is_dropped() {
        let (events, _) = extract(&["RPSV Debug: RTC latency=0ms, bufferSizeMs=600"]);
        assert!(events.is_empty());
    }

    #[test]
    fn buffer_size_range_bounds_are_inclusive() {
        let (events, _) = extract(&[
            "RPSV Debug: bufferSizeMs=5",
            "RPSV Debug: bufferSizeMs=500",
            "RPSV Debug: bufferSizeMs=4",
            "RPSV Debug: bufferSizeMs=501",
        ]);
        let buffers: Vec<f64> = events.iter().map(|e| e.value).collect();
        assert_eq!(buffers, vec![5.0, 500.0]);
    }

    #[test]
    fn rtc_latency_alone_produces_nothing() {
        let (events, diagnostics) = extract(&["RPSV Debug: RTC latency=4ms"]);
        assert!(events.is_empty());
        assert_eq!(diagnostics.rpsv_debug_lines, 1);
    }

    #[test]
    fn plausible_buffer_with_rtc_latency_is_kept() {
        let (events, _) = extract(&["RPSV Debug: RTC latency=0ms, bufferSizeMs=15"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MetricKind::BufferSize);
        assert_eq!(events[0].value, 15.0);
    }

    #[test]
    fn unrelated_lines_are_skipped_silently() {
        let (events, diagnostics) = extract(&["server listening on :8080", "", "client joined"]);
        assert!(events.is_empty());
        assert_eq!(diagnostics, Diagnostics::default());
    }

    #[test]
    fn sample_indices_count_per_kind() {
        let (events, _) = extract(&[
            "WS lane (latency=10ms)",
            "WS lane (latency=11ms)",
            "RPSV Debug: PlaybackError=1ms",
            "WS lane (latency=12ms)",
        ]);
        let latency_ats: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == MetricKind::Latency)
            .map(|e| e.at)
            .collect();
        assert_eq!(latency_ats, vec![0.0, 1.0, 2.0]);
        let error_ats: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == MetricKind::PlaybackError)
            .map(|e| e.at)
            .collect();
        assert_eq!(error_ats, vec![0.0]);
    }

    #[test]
    fn parsed_tagged_line_short_circuits_free_text_rules() {
        // Both grammars on one line: the tagged payload wins and the
        // free-text latency must not double-count.
        let (events, _) =
            extract(&[r#"METRIC {"kind":"tcp_ws","latencyMs":9} WS lane (latency=99ms)"#]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 9.0);
    }

    #[test]
    fn failed_tagged_line_still_gets_free_text_rules() {
        let (events, diagnostics) = extract(&["METRIC {bad} WS lane (latency=31ms)"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, 31.0);
        assert_eq!(diagnostics.tagged_parse_failures, 1);
        assert_eq!(diagnostics.ws_lane_lines, 1);
    }

    #[test]
    fn decimal_latencies_are_accepted() {
        let (events, _) = extract(&["WS lane (latency=23.75ms)"]);
        assert_eq!(events[0].value, 23.75);
    }
}

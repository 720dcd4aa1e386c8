//! End-to-end run over fixture inputs: log bytes in, report and CSV out.

use std::fs;

use rpsv_analysis::{aggregate::Aggregator, export, report};
use rpsv_capture::{encoding, extract::LineExtractor, snapshot};

const LOG_CONTENT: &str = concat!(
    "server starting up\n",
    "METRIC {\"kind\":\"tcp_ws\",\"latencyMs\":23.5,\"ts\":1000}\n",
    "METRIC {\"kind\":\"tcp_ws\",\"latencyMs\":25.0,\"ts\":1500}\n",
    "METRIC {\"kind\":\"tcp_ws\",\"latencyMs\":21.0,\"ts\":2100}\n",
    "🎯 WS lane: noteOn (latency=24ms)\n",
    "WS lane: connection opened\n",
    "RPSV Debug: PlaybackError=2ms, InterPlayback=500ms\n",
    "RPSV Debug: PlaybackError=-3ms, InterPlayback=0ms\n",
    "RPSV Debug: PlaybackError=1ms, InterPlayback=498ms\n",
    "RPSV Debug: RTC latency=0ms, bufferSizeMs=15\n",
    "RPSV Debug: RTC latency=0ms, bufferSizeMs=600\n",
    "METRIC {\"kind\":\"rpsv_rtc\",\"bufferSizeMs\":40,\"rttMs\":12.5}\n",
    "METRIC not-even-json\n",
    "unrelated chatter\n",
);

#[test]
fn log_and_snapshots_flow_through_to_report_and_csv() {
    let dir = tempfile::tempdir().expect("create temp dir");

    // Log arrives UTF-16LE with a BOM, the way PowerShell redirects it.
    let log_path = dir.path().join("server.log");
    let mut log_bytes = vec![0xFF, 0xFE];
    for unit in LOG_CONTENT.encode_utf16() {
        log_bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(&log_path, &log_bytes).expect("write log fixture");

    let stats_dir = dir.path().join("dev-stats");
    fs::create_dir(&stats_dir).expect("create stats dir");
    fs::write(
        stats_dir.join("snap-1.json"),
        r#"{"serverTime": 9000, "clients": [{"latencyHistory": [11.0, 13.0], "bufferSizeMs": 35}]}"#,
    )
    .expect("write snapshot fixture");
    fs::write(stats_dir.join("snap-2.json"), "broken{").expect("write snapshot fixture");

    let lines = encoding::read_lines(&log_path).expect("log decodes");
    let mut extractor = LineExtractor::new();
    let events = extractor.extract_lines(lines.iter().map(String::as_str));

    let diagnostics = extractor.diagnostics();
    assert_eq!(diagnostics.tagged_lines, 5);
    assert_eq!(diagnostics.tagged_parse_failures, 1);
    assert_eq!(diagnostics.ws_lane_lines, 2);
    assert_eq!(diagnostics.ws_lane_unmatched, 1);
    assert_eq!(diagnostics.rpsv_debug_lines, 5);

    let batch = snapshot::load(&stats_dir).expect("snapshot dir loads");
    assert_eq!(batch.snapshots.len(), 1);
    assert_eq!(batch.skipped_files, 1);

    let mut aggregator = Aggregator::new();
    for event in events {
        aggregator.record(event);
    }
    for snap in &batch.snapshots {
        aggregator.record_snapshot(snap);
    }
    let (tcp, rpsv) = aggregator.finish();

    // 3 tagged + 1 free-text TCP latencies; ts 1000/1500/2100 derive
    // two positive inter-arrival gaps.
    assert_eq!(tcp.latency_samples.len(), 4);
    assert_eq!(tcp.inter_arrival_times, vec![500.0, 600.0]);
    // Signed errors survive, the zero interval does not.
    assert_eq!(rpsv.playback_errors, vec![2.0, -3.0, 1.0]);
    assert_eq!(rpsv.inter_playback_times, vec![500.0, 498.0]);
    // 15 in-range free-text + 40 tagged + 35 from the snapshot; 600
    // was discarded as a sentinel.
    assert_eq!(
        rpsv.buffer_sizes.iter().map(|s| s.value).collect::<Vec<_>>(),
        vec![15.0, 40.0, 35.0]
    );
    // RTT plus two snapshot history entries proxy RPSV latency.
    assert_eq!(rpsv.latency_samples.len(), 3);

    let rendered = report::render(&tcp, &rpsv);
    assert!(rendered.contains("[TCP] WebSocket Immediate Mode:"));
    assert!(rendered.contains("[RPSV] RTC + Adaptive Buffer Mode:"));
    assert!(rendered.contains("[COMPARISON]"));

    let csv_path = dir.path().join("analysis_results.csv");
    export::export_to_path(&tcp, &rpsv, &csv_path).expect("csv export");
    let csv_content = fs::read_to_string(&csv_path).expect("read csv back");
    let mut reader = csv::Reader::from_reader(csv_content.as_bytes());
    for record in reader.records() {
        let record = record.expect("valid csv record");
        assert!(
            rendered.contains(&record[2]),
            "CSV value {} missing from report",
            &record[2]
        );
    }
}

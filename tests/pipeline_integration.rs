//! End-to-end pipeline tests: windowed collection with a canned source,
//! normalization, traceroute dataset build, and the pivot hand-off.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use pathprep::config::CollectorConfig;
use pathprep::index::ThroughputSource;
use pathprep::models::{IpVersion, RawThroughputRecord, TracerouteRecord};
use pathprep::pipeline::{
    protocol_datasets, split_time_period, DataCollector, PathPivot, TimeWindow,
};
use pathprep::store::SnapshotStore;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Source that serves a fixed number of records per window and fails for
/// one window start hour.
struct CannedSource {
    fail_hour: Option<u32>,
}

#[async_trait]
impl ThroughputSource for CannedSource {
    async fn scan(&self, window: &TimeWindow) -> Result<Vec<RawThroughputRecord>> {
        let hour: u32 = window.start.format("%H").to_string().parse()?;
        if self.fail_hour == Some(hour) {
            anyhow::bail!("simulated index failure");
        }
        let ts = window.start.to_rfc3339();
        Ok((0..3)
            .map(|i| RawThroughputRecord {
                router: Some(format!("192.0.2.{}", hour + i)),
                throughput: Some(100.0 + hour as f64),
                throughput_ts: Some(ts.clone()),
                ipv6: Some(false),
                path_complete: Some(true),
                destination_reached: Some(true),
                stable: Some(i % 2 == 0),
                src_site: Some("SITE-A".into()),
                dest_site: Some("SITE-B".into()),
            })
            .collect())
    }
}

fn make_trace(idx: usize, ipv6: bool, hops: &[&str], ttls: &[u32]) -> TracerouteRecord {
    TracerouteRecord {
        src: "host-a".into(),
        dest: "host-b".into(),
        src_site: Some("SITE-A".into()),
        dest_site: Some("SITE-B".into()),
        ipv6,
        path_complete: true,
        destination_reached: idx % 2 == 0,
        route_hash: Some(format!("route{}", idx)),
        hops: hops.iter().map(|h| h.to_string()).collect(),
        ttls: ttls.to_vec(),
        timestamp_ms: 1_722_470_400_000 + idx as i64,
        pair: String::new(),
        site_pair: None,
        row_index: 0,
    }
}

#[tokio::test]
async fn collect_normalize_and_export() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("throughput.json");
    let csv = dir.path().join("throughput.csv");

    let config = CollectorConfig {
        period: Some((
            Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 8, 2, 0, 0, 0).unwrap(),
        )),
        bin_hours: 4,
        ip_version: Some(IpVersion::V4),
        save_to_file: true,
        snapshot_path: snapshot.clone(),
        csv_export: Some(csv.clone()),
        concurrency: Some(3),
    };

    // Window starting at 08:00 fails; five of six windows contribute.
    let collector = DataCollector::new(Arc::new(CannedSource { fail_hour: Some(8) }), config);
    let records = collector.run().await.unwrap();

    assert_eq!(records.len(), 5 * 3);
    assert!(records.iter().all(|r| r.ipv6 == 0));
    assert!(records.iter().all(|r| r.src_site == "SITE-A"));
    // Window starts are 4h apart, so each rounds to its own 2h bucket start.
    assert!(records
        .iter()
        .all(|r| r.rounded_throughput_ts == r.throughput_ts));

    // Snapshot was persisted and serves the no-period fallback.
    assert!(snapshot.exists());
    let fallback = DataCollector::new(
        Arc::new(CannedSource { fail_hour: None }),
        CollectorConfig {
            period: None,
            ip_version: Some(IpVersion::V4),
            snapshot_path: snapshot,
            ..CollectorConfig::default()
        },
    );
    let reloaded = fallback.run().await.unwrap();
    assert_eq!(reloaded.len(), records.len());

    // CSV export: header plus one line per record, no index column.
    let text = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), records.len() + 1);
    assert!(lines[0].starts_with("router,throughput,"));
}

#[tokio::test]
async fn window_split_matches_collection_fanout() {
    init_tracing();
    let start = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 8, 2, 0, 0, 0).unwrap();

    let windows = split_time_period(start, end, 4);
    assert_eq!(windows.len(), 6);

    let collector = DataCollector::new(
        Arc::new(CannedSource { fail_hour: None }),
        CollectorConfig::default(),
    );
    let raw = collector.collect(&windows).await;
    assert_eq!(raw.len(), 6 * 3);
}

#[test]
fn dataset_build_then_pivot() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new();

    let raw = vec![
        make_trace(0, false, &["r1", "r2", "r3"], &[1, 2, 3]),
        make_trace(1, false, &["r1", "r2", "r3"], &[1, 2, 3]), // duplicate path
        make_trace(2, false, &["r1", "r4"], &[1, 4]),          // too short, filtered
        make_trace(3, false, &["r1", "r4", "r5"], &[1, 3, 5]),
        make_trace(4, true, &["x1", "x2", "203.0.113.9"], &[1, 2, 3]), // v6 with v4 tail
    ];
    store.write(&raw, &dir.path().join("ps_trace_batch0")).unwrap();

    let datasets = protocol_datasets(&store, dir.path(), IpVersion::V4).unwrap();
    // Records 0, 1, 3 survive validity filtering into the v4 subset.
    assert_eq!(datasets.records.len(), 3);
    // Two distinct path signatures.
    assert_eq!(datasets.clean_paths.len(), 2);

    let pivot = PathPivot::build(
        &datasets.records,
        &datasets.clean_paths,
        "SITE-A",
        "SITE-B",
    )
    .unwrap();
    assert_eq!(pivot.ttls, vec![1, 2, 3, 5]);
    assert_eq!(pivot.rows.len(), 2);

    // First signature covers TTLs 1..3, second skips TTL 2.
    assert_eq!(pivot.rows[0].routers[1].as_deref(), Some("r2"));
    assert_eq!(pivot.rows[1].routers[1], None);
    assert_eq!(pivot.rows[1].routers[3].as_deref(), Some("r5"));

    // The derived files can be read back through the same store API.
    let reloaded = protocol_datasets(&store, dir.path(), IpVersion::V4).unwrap();
    assert_eq!(reloaded.clean_paths.len(), 2);
    assert_eq!(
        reloaded.clean_paths[0].path_id,
        datasets.clean_paths[0].path_id
    );
}

#[test]
fn missing_location_yields_no_data_not_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new();

    let got: Option<Vec<TracerouteRecord>> = store
        .read_many(&dir.path().join("nowhere"), "ps_trace")
        .unwrap();
    assert!(got.is_none());

    let missing = Path::new("definitely-not-here.json");
    let got: Option<Vec<TracerouteRecord>> = store.read_one(missing).unwrap();
    assert!(got.is_none());
}

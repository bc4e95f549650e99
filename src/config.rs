//! Pipeline configuration.

use crate::models::IpVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the windowed throughput collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Collection period `[start, end)`. When `None`, the collector falls
    /// back to the snapshot at `snapshot_path`.
    pub period: Option<(DateTime<Utc>, DateTime<Utc>)>,

    /// Window width in hours.
    pub bin_hours: u32,

    /// Protocol subset to keep; `None` passes both through.
    pub ip_version: Option<IpVersion>,

    /// Persist the raw collected batch to `snapshot_path` after a period run.
    pub save_to_file: bool,

    /// Snapshot location: written after collection, read as the fallback
    /// source when no period is configured.
    pub snapshot_path: PathBuf,

    /// Optional flat CSV export of the normalized records (no index column).
    pub csv_export: Option<PathBuf>,

    /// Concurrent window queries. `None` uses the platform's available
    /// parallelism.
    pub concurrency: Option<usize>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            period: None,
            bin_hours: 4,
            ip_version: None,
            save_to_file: false,
            snapshot_path: PathBuf::from("throughput_sample.json"),
            csv_export: None,
            concurrency: None,
        }
    }
}

/// Configuration for the search-index client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the index endpoint, e.g. `https://es.example.net:9200`.
    pub base_url: String,
    /// Index holding the throughput records.
    pub index: String,
    /// Page size per scan request.
    pub page_size: usize,
    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".into(),
            index: "routers".into(),
            page_size: 1000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Serialize durations as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

//! Record types for traceroute and throughput telemetry.
//!
//! Raw throughput records mirror what the search index actually returns:
//! every field optional, flag fields arriving as bools, integers, or strings
//! depending on the producer version. The clean form is only constructed by
//! the normalizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// IP protocol version selector for subset filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn as_str(&self) -> &str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }

    /// Whether a record's `ipv6` flag belongs to this subset.
    #[inline]
    pub fn matches(&self, ipv6: bool) -> bool {
        match self {
            IpVersion::V4 => !ipv6,
            IpVersion::V6 => ipv6,
        }
    }
}

/// One traceroute test: an ordered hop list with parallel TTLs.
///
/// `route_hash` is ingested from the raw `route-sha1` field. The `pair`,
/// `site_pair`, and `row_index` fields are derived on load by
/// [`TracerouteRecord::derive_fields`] and persisted with the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerouteRecord {
    pub src: String,
    pub dest: String,
    pub src_site: Option<String>,
    pub dest_site: Option<String>,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default)]
    pub path_complete: bool,
    #[serde(default)]
    pub destination_reached: bool,
    #[serde(rename = "route-sha1", default)]
    pub route_hash: Option<String>,
    pub hops: Vec<String>,
    pub ttls: Vec<u32>,
    /// Test timestamp in epoch milliseconds.
    #[serde(rename = "timestamp", default)]
    pub timestamp_ms: i64,

    // Derived fields, set by derive_fields().
    #[serde(default)]
    pub pair: String,
    #[serde(default)]
    pub site_pair: Option<String>,
    #[serde(default)]
    pub row_index: usize,
}

impl TracerouteRecord {
    /// Set the derived composite fields for a record at position `idx` in
    /// its loaded batch.
    pub fn derive_fields(&mut self, idx: usize) {
        self.pair = format!("{}-{}", self.src, self.dest);
        self.site_pair = match (&self.src_site, &self.dest_site) {
            (Some(s), Some(d)) => Some(format!("{} -> {}", s, d)),
            _ => None,
        };
        self.row_index = idx;
    }

    /// Test timestamp as a UTC datetime, if representable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

/// A throughput record exactly as returned by the index: nothing trusted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawThroughputRecord {
    #[serde(default)]
    pub router: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub throughput: Option<f64>,
    #[serde(default)]
    pub throughput_ts: Option<String>,
    #[serde(default, deserialize_with = "de_opt_flag")]
    pub ipv6: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_flag")]
    pub path_complete: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_flag")]
    pub destination_reached: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_flag")]
    pub stable: Option<bool>,
    #[serde(default)]
    pub src_site: Option<String>,
    #[serde(default)]
    pub dest_site: Option<String>,
}

/// A normalized throughput record. Flags are 1/0 for the downstream pivot,
/// matching what the visualization layer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputRecord {
    pub router: String,
    pub throughput: f64,
    pub throughput_ts: DateTime<Utc>,
    pub src_site: String,
    pub dest_site: String,
    pub ipv6: u8,
    /// Unix whole seconds derived from `throughput_ts`.
    pub timestamp: i64,
    /// `throughput_ts` floored to the 2-hour bucket.
    pub rounded_throughput_ts: DateTime<Utc>,
    pub path_complete: u8,
    /// Whether `router` is a private address (malformed addresses are 0).
    pub private: u8,
    pub destination_reached: u8,
    pub stable: u8,
}

/// Deserialize an optional flag that may come as a bool, number, or string.
fn de_opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(b)) => Ok(Some(b)),
        Some(Flag::Int(i)) => Ok(Some(i != 0)),
        Some(Flag::Float(f)) => Ok(Some(f != 0.0)),
        Some(Flag::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "invalid flag value: {}",
                other
            ))),
        },
    }
}

/// Deserialize an optional number that may come as a string or number.
fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(f64),
        String(String),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Number(n)) => Ok(Some(n)),
        Some(StringOrNumber::String(s)) => {
            s.parse().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_fields() {
        let mut rec = TracerouteRecord {
            src: "host-a".into(),
            dest: "host-b".into(),
            src_site: Some("SITE-A".into()),
            dest_site: Some("SITE-B".into()),
            ipv6: false,
            path_complete: true,
            destination_reached: true,
            route_hash: None,
            hops: vec!["10.0.0.1".into()],
            ttls: vec![1],
            timestamp_ms: 0,
            pair: String::new(),
            site_pair: None,
            row_index: 0,
        };
        rec.derive_fields(7);
        assert_eq!(rec.pair, "host-a-host-b");
        assert_eq!(rec.site_pair.as_deref(), Some("SITE-A -> SITE-B"));
        assert_eq!(rec.row_index, 7);
    }

    #[test]
    fn test_derive_fields_missing_site() {
        let mut rec = TracerouteRecord {
            src: "a".into(),
            dest: "b".into(),
            src_site: None,
            dest_site: Some("SITE-B".into()),
            ipv6: false,
            path_complete: false,
            destination_reached: false,
            route_hash: None,
            hops: vec![],
            ttls: vec![],
            timestamp_ms: 0,
            pair: String::new(),
            site_pair: None,
            row_index: 0,
        };
        rec.derive_fields(0);
        assert!(rec.site_pair.is_none());
    }

    #[test]
    fn test_route_hash_ingested_from_route_sha1() {
        let json = r#"{
            "src": "a", "dest": "b",
            "src_site": "A", "dest_site": "B",
            "ipv6": false,
            "route-sha1": "cafe1234",
            "hops": ["10.0.0.1"], "ttls": [1],
            "timestamp": 1700000000000
        }"#;
        let rec: TracerouteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.route_hash.as_deref(), Some("cafe1234"));
        assert_eq!(rec.timestamp_ms, 1_700_000_000_000);
        assert!(rec.timestamp().is_some());
    }

    #[test]
    fn test_raw_throughput_flag_forms() {
        let json = r#"{
            "router": "192.0.2.1",
            "throughput": "812.5",
            "throughput_ts": "2024-08-01T06:22:19.000Z",
            "ipv6": 0,
            "path_complete": true,
            "destination_reached": "1",
            "stable": 1.0
        }"#;
        let rec: RawThroughputRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.ipv6, Some(false));
        assert_eq!(rec.path_complete, Some(true));
        assert_eq!(rec.destination_reached, Some(true));
        assert_eq!(rec.stable, Some(true));
        assert_eq!(rec.throughput, Some(812.5));
    }

    #[test]
    fn test_raw_throughput_missing_fields_stay_none() {
        let rec: RawThroughputRecord = serde_json::from_str(r#"{"router": "10.0.0.9"}"#).unwrap();
        assert_eq!(rec.router.as_deref(), Some("10.0.0.9"));
        assert!(rec.throughput_ts.is_none());
        assert!(rec.ipv6.is_none());
    }

    #[test]
    fn test_ip_version_matches() {
        assert!(IpVersion::V4.matches(false));
        assert!(!IpVersion::V4.matches(true));
        assert!(IpVersion::V6.matches(true));
        assert_eq!(IpVersion::V6.as_str(), "ipv6");
    }
}

//! Throughput Record Normalizer
//!
//! Converts raw index records into clean, fully-populated records:
//! protocol filtering, null dropping, timestamp parsing, private-address
//! classification, 2-hour bucketing, and flag coercion to 1/0.
//!
//! Timestamp parsing happens after the null drop, so a record whose
//! timestamp fails to parse is dropped at that point rather than surviving
//! with a hole in it.

use chrono::{DateTime, Duration, DurationRound, Utc};
use std::net::IpAddr;
use tracing::debug;

use crate::models::{IpVersion, RawThroughputRecord, ThroughputRecord};

/// Width of the rounding bucket for `rounded_throughput_ts`.
const BUCKET_HOURS: i64 = 2;

/// Normalize a raw batch, keeping only the `ip_filter` subset when one is
/// given.
pub fn normalize(
    raw: Vec<RawThroughputRecord>,
    ip_filter: Option<IpVersion>,
) -> Vec<ThroughputRecord> {
    let total = raw.len();
    let records: Vec<ThroughputRecord> = raw
        .into_iter()
        .filter(|rec| match (ip_filter, rec.ipv6) {
            (Some(version), Some(ipv6)) => version.matches(ipv6),
            (Some(_), None) => false,
            (None, _) => true,
        })
        .filter_map(clean_record)
        .collect();

    debug!(
        "normalized {} of {} raw throughput records",
        records.len(),
        total
    );
    records
}

/// Build a clean record, or `None` when any required field is missing or
/// the timestamp fails to parse.
fn clean_record(raw: RawThroughputRecord) -> Option<ThroughputRecord> {
    let router = raw.router?;
    let throughput = raw.throughput?;
    let ts_raw = raw.throughput_ts?;
    let ipv6 = raw.ipv6?;
    let path_complete = raw.path_complete?;
    let destination_reached = raw.destination_reached?;
    let stable = raw.stable?;
    let src_site = raw.src_site?;
    let dest_site = raw.dest_site?;

    let throughput_ts = parse_timestamp(&ts_raw)?;
    let rounded_throughput_ts = throughput_ts
        .duration_trunc(Duration::hours(BUCKET_HOURS))
        .unwrap_or(throughput_ts);
    let private = is_private_address(&router);

    Some(ThroughputRecord {
        timestamp: throughput_ts.timestamp(),
        rounded_throughput_ts,
        router,
        throughput,
        throughput_ts,
        src_site,
        dest_site,
        ipv6: ipv6 as u8,
        path_complete: path_complete as u8,
        private: private as u8,
        destination_reached: destination_reached as u8,
        stable: stable as u8,
    })
}

/// Parse an index timestamp. Accepts RFC 3339 and the bare
/// `%Y-%m-%dT%H:%M:%S[.fff]` form without a zone suffix (treated as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whether `addr` parses as a private or reserved IP: RFC 1918, loopback,
/// link-local, 0.0.0.0/8, the IETF protocol and documentation nets,
/// benchmarking 198.18.0.0/15, and 240.0.0.0/4; for IPv6 the unspecified,
/// loopback, discard, unique-local, link-local, and documentation ranges.
/// Malformed addresses are classified as not private.
pub fn is_private_address(addr: &str) -> bool {
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => is_private_v4(v4),
        Ok(IpAddr::V6(v6)) => is_private_v6(v6),
        Err(_) => false,
    }
}

fn is_private_v4(v4: std::net::Ipv4Addr) -> bool {
    let o = v4.octets();
    v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || o[0] == 0                                    // 0.0.0.0/8
        || (o[0] == 192 && o[1] == 0 && o[2] == 0)      // 192.0.0.0/24 (IETF)
        || (o[0] == 192 && o[1] == 0 && o[2] == 2)      // 192.0.2.0/24 (doc)
        || (o[0] == 198 && (o[1] & 0xfe) == 18)         // 198.18.0.0/15
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)   // 198.51.100.0/24 (doc)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)    // 203.0.113.0/24 (doc)
        || o[0] >= 240                                  // 240.0.0.0/4
}

fn is_private_v6(v6: std::net::Ipv6Addr) -> bool {
    if let Some(mapped) = v6.to_ipv4_mapped() {
        return is_private_v4(mapped);
    }
    let seg = v6.segments();
    v6.is_loopback()
        || v6.is_unspecified()
        || (seg[0] & 0xfe00) == 0xfc00                          // fc00::/7
        || (seg[0] & 0xffc0) == 0xfe80                          // fe80::/10
        || (seg[0] == 0x0100 && seg[1..4] == [0, 0, 0])         // 100::/64
        || (seg[0] == 0x2001 && seg[1] == 0x0db8)               // 2001:db8::/32
        || (seg[0] == 0x2001 && seg[1] < 0x0200)                // 2001::/23
}

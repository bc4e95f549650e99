//! Traceroute Validity Filter
//!
//! Removes structurally invalid traceroutes before deduplication:
//! - IPv6-flagged tests that actually recorded an IPv4 path (the final hop
//!   is an IPv4 dotted quad),
//! - degenerate paths of two hops or fewer,
//! - records missing a site label, unless a route hash identifies them.

use tracing::info;

use crate::models::TracerouteRecord;

/// Remove invalid traceroute records, logging the share removed.
///
/// A record is dropped when:
/// - `hops.len() <= 2`, regardless of protocol flag; or
/// - `ipv6` is set, the path has more than two hops, and the final hop is an
///   IPv4 literal; or
/// - either site label is missing and `route_hash` is null. A record with a
///   route hash is kept even without site labels.
pub fn remove_invalid(records: Vec<TracerouteRecord>) -> Vec<TracerouteRecord> {
    let total = records.len();
    let mut flagged = 0usize;
    let mut null_site = 0usize;

    let kept: Vec<TracerouteRecord> = records
        .into_iter()
        .filter(|rec| {
            let short = rec.hops.len() <= 2;
            let v6_with_v4_tail = rec.ipv6
                && rec.hops.len() > 2
                && rec.hops.last().map(|h| is_ipv4_literal(h)).unwrap_or(false);
            let missing_site = rec.src_site.is_none() || rec.dest_site.is_none();

            if short || v6_with_v4_tail {
                flagged += 1;
            }
            if missing_site {
                null_site += 1;
            }

            let site_ok = !missing_site || rec.route_hash.is_some();
            !short && !v6_with_v4_tail && site_ok
        })
        .collect();

    if total > 0 {
        let pct = ((flagged + null_site) as f64 / total as f64) * 100.0;
        info!("{}% invalid entries removed", pct.round());
    }

    kept
}

/// Strict IPv4 dotted-quad check: four octets 0-255 with no leading zeros,
/// optionally dot-terminated.
pub(crate) fn is_ipv4_literal(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    let mut count = 0;
    for octet in s.split('.') {
        count += 1;
        if count > 4 || octet.is_empty() || octet.len() > 3 {
            return false;
        }
        if !octet.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if octet.len() > 1 && octet.starts_with('0') {
            return false;
        }
        match octet.parse::<u16>() {
            Ok(v) if v <= 255 => {}
            _ => return false,
        }
    }
    count == 4
}

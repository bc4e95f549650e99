//! Path-Signature Deduplication
//!
//! Many traceroutes record the same route. The identity of a route is its
//! `(hops, ttls)` pair; this module reduces a protocol subset to one
//! representative per distinct signature, keeping the first-encountered
//! record in input order.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::models::{IpVersion, TracerouteRecord};

/// One distinct route pattern, projected to the columns the downstream
/// pivot needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSignature {
    pub row_index: usize,
    pub route_hash: Option<String>,
    pub hops: Vec<String>,
    pub ttls: Vec<u32>,
    pub hops_str: String,
    pub ttls_str: String,
    /// Stable identifier derived from the dedup key, used as the pivot's
    /// row key.
    pub path_id: String,
}

impl PathSignature {
    fn from_record(rec: &TracerouteRecord) -> Self {
        let (hops_str, ttls_str) = dedup_key(rec);
        let path_id = path_id(&hops_str, &ttls_str);
        Self {
            row_index: rec.row_index,
            route_hash: rec.route_hash.clone(),
            hops: rec.hops.clone(),
            ttls: rec.ttls.clone(),
            hops_str,
            ttls_str,
            path_id,
        }
    }
}

/// Stringified forms of the hop and TTL sequences, the dedup key.
fn dedup_key(rec: &TracerouteRecord) -> (String, String) {
    let hops_str = rec.hops.join(",");
    let ttls_str = rec
        .ttls
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",");
    (hops_str, ttls_str)
}

/// Stable path identifier from the dedup key.
fn path_id(hops_str: &str, ttls_str: &str) -> String {
    let mut hasher = DefaultHasher::new();
    hops_str.hash(&mut hasher);
    ttls_str.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Reduce the `subset`-matching records to one [`PathSignature`] per
/// distinct `(hops, ttls)` key, first occurrence wins.
pub fn deduplicate(records: &[TracerouteRecord], subset: IpVersion) -> Vec<PathSignature> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut signatures = Vec::new();

    for rec in records.iter().filter(|r| subset.matches(r.ipv6)) {
        let key = dedup_key(rec);
        if seen.insert(key) {
            signatures.push(PathSignature::from_record(rec));
        }
    }
    signatures
}

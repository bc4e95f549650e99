//! TTL-by-Path Pivot
//!
//! The tabular view consumed by the visualization layer: one row per
//! distinct path signature between a site pair, one column per TTL, each
//! cell the router observed at that TTL. Rendering is out of scope; this is
//! the last shape the data takes before it leaves the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::models::TracerouteRecord;
use crate::pipeline::dedup::PathSignature;

/// Pivoted path table for one site pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPivot {
    pub src_site: String,
    pub dest_site: String,
    /// Sorted distinct TTL columns.
    pub ttls: Vec<u32>,
    pub rows: Vec<PivotRow>,
}

/// One path signature's row: routers aligned to the pivot's TTL columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotRow {
    pub path_id: String,
    pub destination_reached: bool,
    /// One cell per entry in `PathPivot::ttls`; `None` where this path has
    /// no hop at that TTL.
    pub routers: Vec<Option<String>>,
}

impl PathPivot {
    /// Build the pivot for `src_site -> dest_site` from the deduplicated
    /// signatures and their representative records.
    ///
    /// Returns `None` when no signature belongs to the site pair.
    pub fn build(
        records: &[TracerouteRecord],
        signatures: &[PathSignature],
        src_site: &str,
        dest_site: &str,
    ) -> Option<PathPivot> {
        let by_index: HashMap<usize, &TracerouteRecord> =
            records.iter().map(|r| (r.row_index, r)).collect();

        // Signatures whose representative record matches the site pair.
        let selected: Vec<(&PathSignature, &TracerouteRecord)> = signatures
            .iter()
            .filter_map(|sig| by_index.get(&sig.row_index).map(|rec| (sig, *rec)))
            .filter(|(_, rec)| {
                rec.src_site.as_deref() == Some(src_site)
                    && rec.dest_site.as_deref() == Some(dest_site)
            })
            .collect();

        if selected.is_empty() {
            debug!("no paths between {} - {}", src_site, dest_site);
            return None;
        }

        let ttl_columns: BTreeSet<u32> = selected
            .iter()
            .flat_map(|(sig, _)| sig.ttls.iter().copied())
            .collect();
        let ttls: Vec<u32> = ttl_columns.into_iter().collect();

        let rows = selected
            .iter()
            .map(|(sig, rec)| {
                let by_ttl: HashMap<u32, &str> = sig
                    .ttls
                    .iter()
                    .copied()
                    .zip(sig.hops.iter().map(|h| h.as_str()))
                    .collect();
                PivotRow {
                    path_id: sig.path_id.clone(),
                    destination_reached: rec.destination_reached,
                    routers: ttls
                        .iter()
                        .map(|t| by_ttl.get(t).map(|h| h.to_string()))
                        .collect(),
                }
            })
            .collect();

        Some(PathPivot {
            src_site: src_site.to_string(),
            dest_site: dest_site.to_string(),
            ttls,
            rows,
        })
    }
}

//! Protocol Dataset Loading
//!
//! Load-or-build logic for the persisted layout:
//! - `{location}/trace_{proto}` — the raw protocol subset,
//! - `{location}/trace_{proto}_clean_paths` — the deduplicated signatures.
//!
//! When both files exist, recomputation is skipped. Otherwise the raw
//! traceroutes under the `ps_trace` prefix are loaded, validated, split by
//! protocol, deduplicated, and both derived tables persisted.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{IpVersion, TracerouteRecord};
use crate::pipeline::dedup::{deduplicate, PathSignature};
use crate::pipeline::validity::remove_invalid;
use crate::store::{SnapshotStore, StoreError};

/// The raw protocol subset together with its deduplicated path signatures.
#[derive(Debug, Clone)]
pub struct ProtocolDatasets {
    pub records: Vec<TracerouteRecord>,
    pub clean_paths: Vec<PathSignature>,
}

fn subset_path(location: &Path, subset: IpVersion) -> PathBuf {
    location.join(format!("trace_{}", subset.as_str()))
}

fn clean_paths_path(location: &Path, subset: IpVersion) -> PathBuf {
    location.join(format!("trace_{}_clean_paths", subset.as_str()))
}

/// Load every traceroute snapshot under `{location}/ps_trace*`, derive the
/// composite fields, and run the validity filter.
pub fn load_traceroutes(
    store: &SnapshotStore,
    location: &Path,
) -> Result<Vec<TracerouteRecord>, StoreError> {
    let mut records: Vec<TracerouteRecord> = store
        .read_many(location, "ps_trace")?
        .unwrap_or_default();
    for (idx, rec) in records.iter_mut().enumerate() {
        rec.derive_fields(idx);
    }

    let trace = remove_invalid(records);
    info!("number of tests: {}", trace.len());
    Ok(trace)
}

/// Return the `subset` datasets, reading them from disk when both derived
/// files exist and building (and persisting) them otherwise.
pub fn protocol_datasets(
    store: &SnapshotStore,
    location: &Path,
    subset: IpVersion,
) -> Result<ProtocolDatasets, StoreError> {
    let subset_loc = subset_path(location, subset);
    let clean_loc = clean_paths_path(location, subset);

    if let (Some(records), Some(clean_paths)) = (
        store.read_one::<TracerouteRecord>(&subset_loc)?,
        store.read_one::<PathSignature>(&clean_loc)?,
    ) {
        info!(
            "{} and {} exist, {} {} tests",
            subset_loc.display(),
            clean_loc.display(),
            records.len(),
            subset.as_str()
        );
        return Ok(ProtocolDatasets {
            records,
            clean_paths,
        });
    }

    let trace = load_traceroutes(store, location)?;
    if !trace.is_empty() {
        let complete = trace.iter().filter(|r| r.path_complete).count();
        info!(
            "path_complete share: {:.2}",
            complete as f64 / trace.len() as f64
        );
    }

    let records: Vec<TracerouteRecord> = trace
        .into_iter()
        .filter(|r| subset.matches(r.ipv6))
        .collect();
    store.write(&records, &subset_loc)?;

    let clean_paths = deduplicate(&records, subset);
    store.write(&clean_paths, &clean_loc)?;

    Ok(ProtocolDatasets {
        records,
        clean_paths,
    })
}

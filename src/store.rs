//! Snapshot Store Adapter
//!
//! Persists full-table snapshots of records as opaque serialized blobs and
//! reads them back, optionally concatenating every file under a prefix.
//! Failures surface as [`StoreError`]; a missing file or empty prefix is
//! `Ok(None)` so callers can distinguish "no data" from "store unreachable".

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::models::ThroughputRecord;

/// File-backed snapshot store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotStore;

impl SnapshotStore {
    pub fn new() -> Self {
        Self
    }

    /// Write a full table snapshot to `path`, creating parent directories.
    pub fn write<T: Serialize>(&self, rows: &[T], path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let blob = serde_json::to_vec(rows)?;
        fs::write(path, blob)?;
        debug!("wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Read one snapshot. `Ok(None)` when the file does not exist.
    pub fn read_one<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<Vec<T>>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let blob = fs::read(path)?;
        let rows: Vec<T> = serde_json::from_slice(&blob)?;
        Ok(Some(rows))
    }

    /// Read every snapshot in `location` whose file name starts with
    /// `prefix`, concatenated in name order. `Ok(None)` when nothing matches.
    pub fn read_many<T: DeserializeOwned>(
        &self,
        location: &Path,
        prefix: &str,
    ) -> Result<Option<Vec<T>>, StoreError> {
        if !location.is_dir() {
            return Ok(None);
        }

        let mut paths: Vec<_> = fs::read_dir(location)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with(prefix))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Ok(None);
        }

        let mut rows: Vec<T> = Vec::new();
        for path in &paths {
            if let Some(mut batch) = self.read_one(path)? {
                rows.append(&mut batch);
            }
        }
        debug!(
            "read {} rows from {} file(s) under {}/{}*",
            rows.len(),
            paths.len(),
            location.display(),
            prefix
        );
        Ok(Some(rows))
    }

    /// Export normalized throughput records as a flat CSV without an index
    /// column.
    pub fn export_csv(&self, records: &[ThroughputRecord], path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);

        writeln!(
            writer,
            "router,throughput,throughput_ts,src_site,dest_site,ipv6,\
             timestamp,rounded_throughput_ts,path_complete,private,destination_reached,stable"
        )?;
        for r in records {
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{},{},{},{}",
                csv_field(&r.router),
                r.throughput,
                r.throughput_ts.to_rfc3339(),
                csv_field(&r.src_site),
                csv_field(&r.dest_site),
                r.ipv6,
                r.timestamp,
                r.rounded_throughput_ts.to_rfc3339(),
                r.path_complete,
                r.private,
                r.destination_reached,
                r.stable,
            )?;
        }
        writer.flush()?;
        debug!("exported {} rows to {}", records.len(), path.display());
        Ok(())
    }
}

/// Quote a free-text CSV field when it contains the delimiter, a quote, or
/// a newline; embedded quotes are doubled.
fn csv_field(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        std::borrow::Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}

/// Errors from the snapshot store.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

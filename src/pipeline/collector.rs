//! Parallel Windowed Collection
//!
//! Splits the requested period into windows, issues one index query per
//! window with bounded concurrency, and merges the batches as they complete.
//! One window's failure is logged and skipped; siblings are unaffected, so a
//! partial result is still returned. Merge order across windows is not
//! guaranteed.

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::index::ThroughputSource;
use crate::models::{RawThroughputRecord, ThroughputRecord};
use crate::pipeline::normalize::normalize;
use crate::pipeline::windows::{split_time_period, TimeWindow};
use crate::store::SnapshotStore;

/// Collects throughput records from a [`ThroughputSource`] and runs them
/// through the normalizer.
pub struct DataCollector<S> {
    source: Arc<S>,
    config: CollectorConfig,
    store: SnapshotStore,
}

impl<S: ThroughputSource + 'static> DataCollector<S> {
    pub fn new(source: Arc<S>, config: CollectorConfig) -> Self {
        Self {
            source,
            config,
            store: SnapshotStore::new(),
        }
    }

    /// Concurrent-query limit: the configured value as given (floored to 1),
    /// or the platform parallelism capped at 32 when unconfigured.
    fn concurrency_limit(&self) -> usize {
        match self.config.concurrency {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 32),
        }
    }

    /// Query every window concurrently and concatenate the non-empty
    /// batches. Failed windows contribute nothing.
    pub async fn collect(&self, windows: &[TimeWindow]) -> Vec<RawThroughputRecord> {
        let concurrency = self.concurrency_limit();

        let results: Vec<(TimeWindow, Result<Vec<RawThroughputRecord>>)> =
            stream::iter(windows.iter().copied())
                .map(|window| {
                    let source = self.source.clone();
                    async move {
                        let res = source.scan(&window).await;
                        (window, res)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        let mut records: Vec<RawThroughputRecord> = Vec::new();
        let mut failed = 0usize;
        for (window, res) in results {
            match res {
                Ok(batch) if !batch.is_empty() => records.extend(batch),
                Ok(_) => {}
                Err(e) => {
                    warn!("window query {} failed: {:#}", window, e);
                    failed += 1;
                }
            }
        }

        debug!(
            "collected {} records from {} windows ({} failed)",
            records.len(),
            windows.len(),
            failed
        );
        records
    }

    /// Collect (or load the snapshot fallback) and normalize.
    ///
    /// With a configured period, the raw batch is optionally persisted to
    /// the snapshot path, and the normalized result optionally exported as
    /// CSV.
    pub async fn run(&self) -> Result<Vec<ThroughputRecord>> {
        let raw = match self.config.period {
            Some((start, end)) => {
                let windows = split_time_period(start, end, self.config.bin_hours);
                let raw = self.collect(&windows).await;
                if self.config.save_to_file && !raw.is_empty() {
                    self.store.write(&raw, &self.config.snapshot_path)?;
                }
                raw
            }
            None => {
                let raw = self
                    .store
                    .read_one::<RawThroughputRecord>(&self.config.snapshot_path)?
                    .unwrap_or_default();
                info!(
                    "loaded {} raw records from {}",
                    raw.len(),
                    self.config.snapshot_path.display()
                );
                raw
            }
        };

        let records = normalize(raw, self.config.ip_version);
        if let Some(path) = &self.config.csv_export {
            self.store.export_csv(&records, path)?;
        }
        Ok(records)
    }
}

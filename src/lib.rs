//! pathprep — data preparation for traceroute and throughput telemetry.
//!
//! Ingests traceroute records (hop sequences with TTL annotations) and
//! throughput records from a search index and snapshot files, cleans and
//! deduplicates them, and exposes tabular views for downstream
//! visualization. No live probing happens here; the pipeline only consumes
//! already-collected records.

pub mod config;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod store;

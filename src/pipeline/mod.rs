//! Data-preparation pipeline.
//!
//! Flow: windowed collection -> normalization -> validity filtering ->
//! deduplication -> persistence, with the pivot as the hand-off shape for
//! visualization.

pub mod collector;
pub mod datasets;
pub mod dedup;
pub mod normalize;
pub mod pivot;
pub mod validity;
pub mod windows;

pub use collector::DataCollector;
pub use datasets::{load_traceroutes, protocol_datasets, ProtocolDatasets};
pub use dedup::{deduplicate, PathSignature};
pub use normalize::normalize;
pub use pivot::{PathPivot, PivotRow};
pub use validity::remove_invalid;
pub use windows::{split_time_period, TimeWindow};

//! Time-window partitioning for collection requests.
//!
//! A requested period `[start, end)` is split into consecutive windows of
//! `bin_hours` width; the last window may be shorter. Window bounds are
//! inclusive on both sides at query time (the index range filter uses
//! `gte`/`lte`), so contiguity here means `end[i] == start[i+1]`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One collection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Lower bound as a strict ISO-8601 UTC timestamp with millis.
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Upper bound as a strict ISO-8601 UTC timestamp with millis.
    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start_iso(), self.end_iso())
    }
}

/// Split `[start, end)` into consecutive windows of `bin_hours` width.
///
/// Returns an empty vector when the period is empty or `bin_hours` is zero.
pub fn split_time_period(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bin_hours: u32,
) -> Vec<TimeWindow> {
    if bin_hours == 0 || start >= end {
        return Vec::new();
    }

    let width = Duration::hours(bin_hours as i64);
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = (cursor + width).min(end);
        windows.push(TimeWindow {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    windows
}

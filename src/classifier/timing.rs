//! Request timing statistics.
//!
//! Intervals are measured between consecutive requests after sorting by
//! timestamp, so input order never affects the result.

use crate::report::{round2, IntervalStats};

/// Interval statistics over a set of request timestamps (ms since epoch).
///
/// The mean is unrounded so thresholds compare against the exact value.
/// Returns `None` with fewer than two timestamps.
pub fn interval_stats(timestamps_ms: &[i64]) -> Option<IntervalStats> {
    if timestamps_ms.len() < 2 {
        return None;
    }

    let mut sorted = timestamps_ms.to_vec();
    sorted.sort_unstable();

    let intervals: Vec<i64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    let sum: i64 = intervals.iter().sum();
    let mean = sum as f64 / intervals.len() as f64;

    // windows(2) over >= 2 elements always yields at least one interval
    let min = intervals.iter().copied().min().unwrap_or(0);
    let max = intervals.iter().copied().max().unwrap_or(0);

    Some(IntervalStats {
        average_interval_ms: mean,
        min_interval_ms: min,
        max_interval_ms: max,
    })
}

impl IntervalStats {
    /// Copy with the mean rounded to 2 decimals for reporting.
    pub fn rounded(&self) -> Self {
        Self {
            average_interval_ms: round2(self.average_interval_ms),
            ..*self
        }
    }
}

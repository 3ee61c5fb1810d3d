//! Common value types shared by the component crates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form property bag attached to nodes, edges, and model metadata.
pub type PropertyMap = HashMap<String, serde_json::Value>;

/// Named numeric metrics (accuracy, latency, loss, ...).
pub type MetricMap = HashMap<String, f64>;

/// A half-open time window `[start, end)`.
///
/// Used by the monitor for drift/report periods and by the feature store for
/// historical queries. `end` must not precede `start`; constructors clamp
/// rather than fail so a degenerate window is simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive window start.
    pub start: DateTime<Utc>,
    /// Exclusive window end.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, swapping the bounds if they arrive reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// The window ending now and reaching `minutes` into the past.
    pub fn last_minutes(minutes: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::minutes(minutes),
            end,
        }
    }

    /// Whether `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Window length in whole minutes (at least 0).
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    /// True when the window covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_swaps_reversed_bounds() {
        let now = Utc::now();
        let earlier = now - Duration::minutes(10);
        let w = TimeWindow::new(now, earlier);
        assert_eq!(w.start, earlier);
        assert_eq!(w.end, now);
        assert_eq!(w.minutes(), 10);
    }

    #[test]
    fn window_contains_is_half_open() {
        let now = Utc::now();
        let w = TimeWindow::new(now - Duration::minutes(5), now);
        assert!(w.contains(now - Duration::minutes(5)));
        assert!(w.contains(now - Duration::seconds(1)));
        assert!(!w.contains(now));
    }

    #[test]
    fn degenerate_window_is_empty() {
        let now = Utc::now();
        let w = TimeWindow::new(now, now);
        assert!(w.is_empty());
        assert_eq!(w.minutes(), 0);
    }
}

//! Metric buckets and per-model thresholds.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated prediction metrics for one wall-clock minute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBucket {
    /// Minutes since the Unix epoch identifying this bucket.
    pub minute: i64,
    /// Predictions recorded in this minute.
    pub predictions: u64,
    /// Predictions that carried ground truth.
    pub labelled: u64,
    /// Sum of per-prediction accuracy scores over `labelled`.
    pub accuracy_sum: f64,
    /// Predictions that carried a latency measurement.
    pub timed: u64,
    /// Sum of latencies in milliseconds over `timed`.
    pub latency_sum_ms: f64,
    /// Errors recorded against this minute.
    pub errors: u64,
}

impl MetricBucket {
    /// Create an empty bucket for a minute key.
    pub fn new(minute: i64) -> Self {
        Self {
            minute,
            ..Self::default()
        }
    }

    /// Bucket key for a timestamp: whole minutes since the epoch.
    pub fn minute_of(at: DateTime<Utc>) -> i64 {
        at.timestamp().div_euclid(60)
    }

    /// Start of this bucket's minute.
    pub fn starts_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.minute * 60, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Running-average accuracy, if any prediction carried ground truth.
    pub fn accuracy(&self) -> Option<f64> {
        (self.labelled > 0).then(|| self.accuracy_sum / self.labelled as f64)
    }

    /// Running-average latency in milliseconds, if measured.
    pub fn latency_ms(&self) -> Option<f64> {
        (self.timed > 0).then(|| self.latency_sum_ms / self.timed as f64)
    }

    /// Errors as a fraction of all recorded outcomes.
    pub fn error_rate(&self) -> f64 {
        let total = self.predictions + self.errors;
        if total == 0 {
            0.0
        } else {
            self.errors as f64 / total as f64
        }
    }

    /// Predictions per second over the minute window.
    pub fn throughput(&self) -> f64 {
        self.predictions as f64 / 60.0
    }
}

/// Per-model alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorThresholds {
    /// Minimum acceptable running-average accuracy.
    pub accuracy_min: f64,
    /// Maximum acceptable running-average latency in milliseconds.
    pub latency_max_ms: f64,
    /// Maximum acceptable error rate.
    pub error_rate_max: f64,
    /// Minimum acceptable throughput (predictions per second), checked
    /// against the most recent completed minute.
    pub throughput_min: f64,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            accuracy_min: 0.8,
            latency_max_ms: 1000.0,
            error_rate_max: 0.05,
            throughput_min: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_averages_require_samples() {
        let bucket = MetricBucket::new(0);
        assert_eq!(bucket.accuracy(), None);
        assert_eq!(bucket.latency_ms(), None);
        assert_eq!(bucket.error_rate(), 0.0);
    }

    #[test]
    fn error_rate_counts_errors_against_all_outcomes() {
        let mut bucket = MetricBucket::new(0);
        bucket.predictions = 19;
        bucket.errors = 1;
        assert!((bucket.error_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn minute_key_floors_toward_minus_infinity() {
        let at = Utc.timestamp_opt(-61, 0).single().unwrap();
        assert_eq!(MetricBucket::minute_of(at), -2);
    }

    #[test]
    fn throughput_is_per_second_over_the_minute() {
        let mut bucket = MetricBucket::new(0);
        bucket.predictions = 600;
        assert!((bucket.throughput() - 10.0).abs() < 1e-12);
    }
}

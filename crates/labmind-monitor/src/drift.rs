//! Model drift evaluation between two periods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labmind_core::{ModelId, TimeWindow};

/// Aggregated metrics over one period's buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// Buckets with at least one recorded outcome.
    pub active_minutes: u64,
    /// Total predictions in the period.
    pub predictions: u64,
    /// Labelled-prediction-weighted average accuracy, if any ground truth.
    pub accuracy: Option<f64>,
    /// Measured-prediction-weighted average latency, if any measured.
    pub latency_ms: Option<f64>,
    /// Errors over all outcomes in the period.
    pub error_rate: f64,
}

impl PeriodStats {
    /// Whether the period carries any usable signal.
    pub fn has_data(&self) -> bool {
        self.predictions > 0
    }
}

/// Outcome of a drift evaluation.
///
/// Thin data never fails the call: when either period has no predictions the
/// report comes back with `insufficient_data` set and no drift verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDriftReport {
    /// Model evaluated.
    pub model_id: ModelId,
    /// Baseline period.
    pub baseline: TimeWindow,
    /// Comparison period.
    pub comparison: TimeWindow,
    /// Aggregates for the baseline period.
    pub baseline_stats: PeriodStats,
    /// Aggregates for the comparison period.
    pub comparison_stats: PeriodStats,
    /// Whether any metric breached its drift threshold.
    pub is_drift: bool,
    /// Mean of the breaching deltas; 0.0 when nothing breached.
    pub drift_score: f64,
    /// Names of metrics that breached ("accuracy", "latency", "error_rate").
    pub affected_metrics: Vec<String>,
    /// True when either period held no predictions.
    pub insufficient_data: bool,
    /// When the evaluation ran.
    pub evaluated_at: DateTime<Utc>,
}

/// Drift thresholds: absolute accuracy delta, relative latency delta,
/// absolute error-rate delta.
pub(crate) const ACCURACY_DELTA_MAX: f64 = 0.05;
pub(crate) const LATENCY_RELATIVE_DELTA_MAX: f64 = 0.2;
pub(crate) const ERROR_RATE_DELTA_MAX: f64 = 0.02;

/// Compare two period aggregates metric by metric.
pub(crate) fn evaluate(
    model_id: ModelId,
    baseline: TimeWindow,
    comparison: TimeWindow,
    baseline_stats: PeriodStats,
    comparison_stats: PeriodStats,
) -> ModelDriftReport {
    if !baseline_stats.has_data() || !comparison_stats.has_data() {
        return ModelDriftReport {
            model_id,
            baseline,
            comparison,
            baseline_stats,
            comparison_stats,
            is_drift: false,
            drift_score: 0.0,
            affected_metrics: Vec::new(),
            insufficient_data: true,
            evaluated_at: Utc::now(),
        };
    }

    let mut affected = Vec::new();
    let mut breaching_deltas = Vec::new();

    if let (Some(base), Some(cmp)) = (baseline_stats.accuracy, comparison_stats.accuracy) {
        let delta = (base - cmp).abs();
        if delta > ACCURACY_DELTA_MAX {
            affected.push("accuracy".to_string());
            breaching_deltas.push(delta);
        }
    }

    if let (Some(base), Some(cmp)) = (baseline_stats.latency_ms, comparison_stats.latency_ms) {
        if base > 0.0 {
            let relative = (cmp - base).abs() / base;
            if relative > LATENCY_RELATIVE_DELTA_MAX {
                affected.push("latency".to_string());
                breaching_deltas.push(relative);
            }
        }
    }

    let error_delta = (baseline_stats.error_rate - comparison_stats.error_rate).abs();
    if error_delta > ERROR_RATE_DELTA_MAX {
        affected.push("error_rate".to_string());
        breaching_deltas.push(error_delta);
    }

    let drift_score = if breaching_deltas.is_empty() {
        0.0
    } else {
        breaching_deltas.iter().sum::<f64>() / breaching_deltas.len() as f64
    };

    ModelDriftReport {
        model_id,
        baseline,
        comparison,
        baseline_stats,
        comparison_stats,
        is_drift: !affected.is_empty(),
        drift_score,
        affected_metrics: affected,
        insufficient_data: false,
        evaluated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn window() -> TimeWindow {
        TimeWindow::last_minutes(10)
    }

    fn stats(accuracy: f64, latency: f64, error_rate: f64) -> PeriodStats {
        PeriodStats {
            active_minutes: 10,
            predictions: 100,
            accuracy: Some(accuracy),
            latency_ms: Some(latency),
            error_rate,
        }
    }

    #[test]
    fn identical_periods_do_not_drift() {
        let report = evaluate(
            Uuid::new_v4(),
            window(),
            window(),
            stats(0.9, 100.0, 0.01),
            stats(0.9, 100.0, 0.01),
        );
        assert!(!report.is_drift);
        assert_eq!(report.drift_score, 0.0);
        assert!(!report.insufficient_data);
    }

    #[test]
    fn accuracy_decline_breaches() {
        let report = evaluate(
            Uuid::new_v4(),
            window(),
            window(),
            stats(0.85, 100.0, 0.01),
            stats(0.70, 100.0, 0.01),
        );
        assert!(report.is_drift);
        assert!(report.affected_metrics.contains(&"accuracy".to_string()));
        assert!((report.drift_score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn latency_breach_is_relative() {
        let report = evaluate(
            Uuid::new_v4(),
            window(),
            window(),
            stats(0.9, 100.0, 0.01),
            stats(0.9, 125.0, 0.01),
        );
        assert!(report.is_drift);
        assert_eq!(report.affected_metrics, vec!["latency".to_string()]);
    }

    #[test]
    fn empty_period_flags_insufficient_data() {
        let report = evaluate(
            Uuid::new_v4(),
            window(),
            window(),
            stats(0.9, 100.0, 0.01),
            PeriodStats::default(),
        );
        assert!(report.insufficient_data);
        assert!(!report.is_drift);
    }

    #[test]
    fn score_averages_breaching_deltas_only() {
        // accuracy delta 0.10 breaches, error delta 0.04 breaches,
        // latency within threshold.
        let report = evaluate(
            Uuid::new_v4(),
            window(),
            window(),
            stats(0.90, 100.0, 0.00),
            stats(0.80, 110.0, 0.04),
        );
        assert!(report.is_drift);
        assert_eq!(report.affected_metrics.len(), 2);
        assert!((report.drift_score - 0.07).abs() < 1e-9);
    }
}

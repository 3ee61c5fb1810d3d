//! The model monitor service.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use labmind_core::{AlertId, ModelId, TimeWindow};

use crate::alerts::{Alert, AlertKind, Severity};
use crate::drift::{evaluate, ModelDriftReport, PeriodStats};
use crate::error::{MonitorError, MonitorResult};
use crate::report::{build, PerformanceReport};
use crate::types::{MetricBucket, MonitorThresholds};

/// How many recent numeric predictions feed the anomaly check.
const RECENT_WINDOW: usize = 100;

/// Prior samples required before the anomaly check activates.
const ANOMALY_MIN_SAMPLES: usize = 10;

/// Standard deviations beyond which a new value is anomalous.
const ANOMALY_SIGMA: f64 = 3.0;

/// One observed prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Input the model was asked about.
    pub input: serde_json::Value,
    /// What the model predicted.
    pub prediction: serde_json::Value,
    /// Ground truth, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
    /// Serving latency in milliseconds, when measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

/// Per-model monitoring state.
#[derive(Debug, Default)]
struct ModelTrack {
    buckets: BTreeMap<i64, MetricBucket>,
    /// Recent numeric prediction values, oldest first.
    recent: VecDeque<f64>,
    thresholds: MonitorThresholds,
}

/// Model monitor: rolling per-minute metrics, anomaly and threshold alerts,
/// drift detection, and performance reports.
///
/// Mutations for one model go through its `DashMap` entry, which serializes
/// them (single-writer per model id). Alerts live in a shared log and are
/// consumed asynchronously; monitoring conditions never raise errors.
#[derive(Debug, Default)]
pub struct ModelMonitor {
    tracks: DashMap<ModelId, ModelTrack>,
    alerts: RwLock<Vec<Alert>>,
}

impl ModelMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction into the current minute bucket, then run the
    /// anomaly and threshold checks.
    ///
    /// Ground truth contributes a per-prediction agreement score to the
    /// bucket's running-average accuracy; latency contributes to the running
    /// average when measured. Breaches become alerts, never errors.
    pub fn record_prediction(&self, model_id: ModelId, record: PredictionRecord) {
        self.record_prediction_at(model_id, record, Utc::now());
    }

    /// Record a prediction against an explicit observation time.
    ///
    /// Used for backfill and replay; buckets key off `at`, not the wall
    /// clock.
    pub fn record_prediction_at(
        &self,
        model_id: ModelId,
        record: PredictionRecord,
        at: chrono::DateTime<Utc>,
    ) {
        let minute = MetricBucket::minute_of(at);
        let mut raised: Vec<Alert> = Vec::new();

        {
            let mut track = self.tracks.entry(model_id).or_default();

            // Anomaly check uses the window as it was BEFORE this value.
            if let Some(value) = record.prediction.as_f64() {
                if let Some(alert) = anomaly_check(model_id, value, &track.recent) {
                    raised.push(alert);
                }
                track.recent.push_back(value);
                while track.recent.len() > RECENT_WINDOW {
                    track.recent.pop_front();
                }
            }

            let bucket = track
                .buckets
                .entry(minute)
                .or_insert_with(|| MetricBucket::new(minute));
            bucket.predictions += 1;
            if let Some(actual) = &record.actual {
                bucket.labelled += 1;
                bucket.accuracy_sum += agreement(&record.prediction, actual);
            }
            if let Some(latency) = record.latency_ms {
                bucket.timed += 1;
                bucket.latency_sum_ms += latency;
            }

            let thresholds = track.thresholds;
            let bucket = track.buckets[&minute].clone();
            let previous = track.buckets.get(&(minute - 1)).cloned();
            raised.extend(threshold_checks(model_id, &bucket, previous.as_ref(), &thresholds));
        }

        self.push_alerts(raised);
    }

    /// Record a serving error against the current minute bucket.
    pub fn record_error(&self, model_id: ModelId, message: &str) {
        let minute = MetricBucket::minute_of(Utc::now());
        let mut raised = Vec::new();
        {
            let mut track = self.tracks.entry(model_id).or_default();
            let thresholds = track.thresholds;
            let bucket = track
                .buckets
                .entry(minute)
                .or_insert_with(|| MetricBucket::new(minute));
            bucket.errors += 1;

            let rate = bucket.error_rate();
            if rate > thresholds.error_rate_max {
                let ratio = (rate - thresholds.error_rate_max) / thresholds.error_rate_max;
                raised.push(Alert::new(
                    model_id,
                    AlertKind::Error,
                    Severity::from_breach_ratio(ratio),
                    format!(
                        "error rate {:.3} exceeds {:.3} ({message})",
                        rate, thresholds.error_rate_max
                    ),
                ));
            }
        }
        self.push_alerts(raised);
    }

    /// Replace the alerting thresholds for a model.
    pub fn set_thresholds(&self, model_id: ModelId, thresholds: MonitorThresholds) {
        self.tracks.entry(model_id).or_default().thresholds = thresholds;
    }

    /// Current thresholds for a model (defaults when untracked).
    pub fn thresholds(&self, model_id: ModelId) -> MonitorThresholds {
        self.tracks
            .get(&model_id)
            .map(|t| t.thresholds)
            .unwrap_or_default()
    }

    /// Detect model drift between two periods.
    ///
    /// Per-metric thresholds: absolute accuracy delta over 0.05, relative
    /// latency delta over 20%, absolute error-rate delta over 0.02. Any
    /// breach raises a drift alert; an empty period comes back flagged
    /// `insufficient_data` instead of failing.
    ///
    /// # Errors
    ///
    /// `ModelNotTracked` when no prediction was ever recorded for the model.
    pub fn detect_model_drift(
        &self,
        model_id: ModelId,
        baseline: TimeWindow,
        comparison: TimeWindow,
    ) -> MonitorResult<ModelDriftReport> {
        let track = self
            .tracks
            .get(&model_id)
            .ok_or(MonitorError::ModelNotTracked(model_id))?;

        let baseline_stats = period_stats(&track.buckets, baseline);
        let comparison_stats = period_stats(&track.buckets, comparison);
        drop(track);

        let report = evaluate(model_id, baseline, comparison, baseline_stats, comparison_stats);

        if report.is_drift {
            warn!(
                %model_id,
                score = report.drift_score,
                affected = ?report.affected_metrics,
                "model drift detected"
            );
            self.push_alerts(vec![Alert::new(
                model_id,
                AlertKind::Drift,
                Severity::from_breach_ratio(report.drift_score),
                format!(
                    "drift score {:.3} across {}",
                    report.drift_score,
                    report.affected_metrics.join(", ")
                ),
            )]);
        }
        Ok(report)
    }

    /// Aggregate a period into totals, averages, uptime, and
    /// recommendations.
    ///
    /// # Errors
    ///
    /// `ModelNotTracked` when no prediction was ever recorded for the model.
    pub fn performance_report(
        &self,
        model_id: ModelId,
        period: TimeWindow,
    ) -> MonitorResult<PerformanceReport> {
        let track = self
            .tracks
            .get(&model_id)
            .ok_or(MonitorError::ModelNotTracked(model_id))?;
        let stats = period_stats(&track.buckets, period);
        let thresholds = track.thresholds;
        drop(track);

        let alert_count = self
            .alerts
            .read()
            .iter()
            .filter(|a| a.model_id == model_id && period.contains(a.created_at))
            .count();

        Ok(build(model_id, period, stats, alert_count, &thresholds))
    }

    /// All alerts for a model, newest first.
    pub fn alerts_for(&self, model_id: ModelId) -> Vec<Alert> {
        let mut hits: Vec<Alert> = self
            .alerts
            .read()
            .iter()
            .filter(|a| a.model_id == model_id)
            .cloned()
            .collect();
        hits.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        hits
    }

    /// Mark an alert resolved.
    ///
    /// # Errors
    ///
    /// `AlertNotFound` for an unknown id.
    pub fn resolve_alert(&self, alert_id: AlertId) -> MonitorResult<Alert> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or(MonitorError::AlertNotFound(alert_id))?;
        alert.resolved = true;
        Ok(alert.clone())
    }

    /// Append alerts, suppressing repeats of the same kind for the same
    /// model within the current minute so a burst of breaching predictions
    /// yields one alert, not hundreds.
    fn push_alerts(&self, raised: Vec<Alert>) {
        if raised.is_empty() {
            return;
        }
        let mut alerts = self.alerts.write();
        for alert in raised {
            let duplicate = alerts.iter().any(|existing| {
                existing.model_id == alert.model_id
                    && existing.kind == alert.kind
                    && !existing.resolved
                    && MetricBucket::minute_of(existing.created_at)
                        == MetricBucket::minute_of(alert.created_at)
            });
            if !duplicate {
                debug!(model_id = %alert.model_id, kind = %alert.kind, severity = ?alert.severity, "alert raised");
                alerts.push(alert);
            }
        }
    }
}

/// Per-prediction agreement score against ground truth.
///
/// Numeric pairs score by relative closeness (1.0 = exact, 0.0 = off by the
/// magnitude of the truth or more); non-numeric pairs score exact-match.
fn agreement(prediction: &serde_json::Value, actual: &serde_json::Value) -> f64 {
    match (prediction.as_f64(), actual.as_f64()) {
        (Some(p), Some(a)) => {
            let scale = a.abs().max(f64::EPSILON);
            (1.0 - (p - a).abs() / scale).clamp(0.0, 1.0)
        }
        _ => {
            if prediction == actual {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Flag a numeric prediction more than [`ANOMALY_SIGMA`] standard deviations
/// from the recent sample mean, once enough prior samples exist.
fn anomaly_check(model_id: ModelId, value: f64, recent: &VecDeque<f64>) -> Option<Alert> {
    if recent.len() < ANOMALY_MIN_SAMPLES {
        return None;
    }
    let n = recent.len() as f64;
    let mean = recent.iter().sum::<f64>() / n;
    let variance = recent.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let deviation = (value - mean).abs();
    if deviation > ANOMALY_SIGMA * std_dev {
        let sigmas = if std_dev > 0.0 {
            deviation / std_dev
        } else {
            f64::INFINITY
        };
        let ratio = (sigmas / ANOMALY_SIGMA - 1.0).max(0.0);
        Some(Alert::new(
            model_id,
            AlertKind::Anomaly,
            Severity::from_breach_ratio(ratio.min(1.0)),
            format!(
                "prediction {value:.4} deviates {:.1} sigma from recent mean {mean:.4}",
                sigmas.min(999.0)
            ),
        ))
    } else {
        None
    }
}

/// Threshold checks for the current bucket, plus throughput against the most
/// recent completed minute.
fn threshold_checks(
    model_id: ModelId,
    bucket: &MetricBucket,
    previous: Option<&MetricBucket>,
    thresholds: &MonitorThresholds,
) -> Vec<Alert> {
    let mut raised = Vec::new();

    if let Some(accuracy) = bucket.accuracy() {
        if accuracy < thresholds.accuracy_min {
            let ratio = (thresholds.accuracy_min - accuracy) / thresholds.accuracy_min;
            raised.push(Alert::new(
                model_id,
                AlertKind::Performance,
                Severity::from_breach_ratio(ratio),
                format!(
                    "running accuracy {accuracy:.3} below minimum {:.3}",
                    thresholds.accuracy_min
                ),
            ));
        }
    }

    if let Some(latency) = bucket.latency_ms() {
        if latency > thresholds.latency_max_ms {
            let ratio = (latency - thresholds.latency_max_ms) / thresholds.latency_max_ms;
            raised.push(Alert::new(
                model_id,
                AlertKind::Performance,
                Severity::from_breach_ratio(ratio),
                format!(
                    "running latency {latency:.0}ms above maximum {:.0}ms",
                    thresholds.latency_max_ms
                ),
            ));
        }
    }

    let error_rate = bucket.error_rate();
    if error_rate > thresholds.error_rate_max {
        let ratio = (error_rate - thresholds.error_rate_max) / thresholds.error_rate_max;
        raised.push(Alert::new(
            model_id,
            AlertKind::Error,
            Severity::from_breach_ratio(ratio),
            format!(
                "error rate {error_rate:.3} above maximum {:.3}",
                thresholds.error_rate_max
            ),
        ));
    }

    // Throughput is judged on a completed minute; the current bucket is
    // always partially filled.
    if let Some(prev) = previous {
        let throughput = prev.throughput();
        if throughput < thresholds.throughput_min {
            let ratio = (thresholds.throughput_min - throughput) / thresholds.throughput_min;
            raised.push(Alert::new(
                model_id,
                AlertKind::Performance,
                Severity::from_breach_ratio(ratio),
                format!(
                    "throughput {throughput:.2}/s below minimum {:.2}/s",
                    thresholds.throughput_min
                ),
            ));
        }
    }

    raised
}

/// Aggregate a window's buckets into period statistics.
fn period_stats(buckets: &BTreeMap<i64, MetricBucket>, window: TimeWindow) -> PeriodStats {
    let first = MetricBucket::minute_of(window.start);
    let last = MetricBucket::minute_of(window.end);

    let mut stats = PeriodStats::default();
    let mut accuracy_sum = 0.0;
    let mut labelled = 0u64;
    let mut latency_sum = 0.0;
    let mut timed = 0u64;
    let mut errors = 0u64;

    for bucket in buckets.range(first..=last).map(|(_, b)| b) {
        if bucket.predictions == 0 && bucket.errors == 0 {
            continue;
        }
        stats.active_minutes += 1;
        stats.predictions += bucket.predictions;
        accuracy_sum += bucket.accuracy_sum;
        labelled += bucket.labelled;
        latency_sum += bucket.latency_sum_ms;
        timed += bucket.timed;
        errors += bucket.errors;
    }

    if labelled > 0 {
        stats.accuracy = Some(accuracy_sum / labelled as f64);
    }
    if timed > 0 {
        stats.latency_ms = Some(latency_sum / timed as f64);
    }
    let outcomes = stats.predictions + errors;
    if outcomes > 0 {
        stats.error_rate = errors as f64 / outcomes as f64;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use uuid::Uuid;

    fn prediction(value: f64) -> PredictionRecord {
        PredictionRecord {
            input: serde_json::json!({}),
            prediction: serde_json::json!(value),
            actual: None,
            latency_ms: None,
        }
    }

    fn scored_prediction(value: f64, actual: f64, latency_ms: f64) -> PredictionRecord {
        PredictionRecord {
            input: serde_json::json!({}),
            prediction: serde_json::json!(value),
            actual: Some(serde_json::json!(actual)),
            latency_ms: Some(latency_ms),
        }
    }

    #[test]
    fn agreement_scores_relative_closeness() {
        assert!((agreement(&serde_json::json!(0.85), &serde_json::json!(1.0)) - 0.85).abs() < 1e-9);
        assert_eq!(agreement(&serde_json::json!(1.0), &serde_json::json!(1.0)), 1.0);
        assert_eq!(
            agreement(&serde_json::json!("anode"), &serde_json::json!("anode")),
            1.0
        );
        assert_eq!(
            agreement(&serde_json::json!("anode"), &serde_json::json!("cathode")),
            0.0
        );
    }

    #[test]
    fn low_accuracy_raises_performance_alert() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        // Agreement 0.5 against the 0.8 default minimum.
        monitor.record_prediction(model, scored_prediction(0.5, 1.0, 10.0));

        let alerts = monitor.alerts_for(model);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::Performance));
    }

    #[test]
    fn repeated_breaches_in_a_minute_raise_one_alert() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        for _ in 0..20 {
            monitor.record_prediction(model, scored_prediction(0.5, 1.0, 10.0));
        }
        let performance: Vec<_> = monitor
            .alerts_for(model)
            .into_iter()
            .filter(|a| a.kind == AlertKind::Performance)
            .collect();
        assert_eq!(performance.len(), 1, "burst must be deduplicated");
    }

    #[test]
    fn anomaly_requires_ten_prior_samples() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();

        // Nine stable samples, then an outlier: still below the activation
        // count, no anomaly alert.
        for _ in 0..9 {
            monitor.record_prediction(model, prediction(1.0));
        }
        monitor.record_prediction(model, prediction(50.0));
        assert!(!monitor
            .alerts_for(model)
            .iter()
            .any(|a| a.kind == AlertKind::Anomaly));
    }

    #[test]
    fn outlier_beyond_three_sigma_raises_anomaly() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();

        // Twelve samples with a little spread, then a far outlier.
        for i in 0..12 {
            monitor.record_prediction(model, prediction(1.0 + (i % 3) as f64 * 0.01));
        }
        monitor.record_prediction(model, prediction(50.0));

        let alerts = monitor.alerts_for(model);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::Anomaly));
    }

    #[test]
    fn drift_scenario_between_accuracy_regimes() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        let mut rng = StdRng::seed_from_u64(7);

        let baseline_window = TimeWindow::new(
            Utc::now() - Duration::minutes(30),
            Utc::now() - Duration::minutes(20),
        );
        let comparison_window = TimeWindow::new(Utc::now() - Duration::minutes(10), Utc::now());

        // Baseline accuracy ~N(0.85, 0.02): predictions near 0.85 against a
        // ground truth of 1.0 score agreement equal to the prediction.
        let high = Normal::new(0.85, 0.02).expect("valid normal");
        for _ in 0..10 {
            let value: f64 = high.sample(&mut rng);
            monitor.record_prediction_at(
                model,
                scored_prediction(value, 1.0, 10.0),
                baseline_window.start + Duration::seconds(30),
            );
        }

        // Comparison accuracy ~N(0.70, 0.02).
        let low = Normal::new(0.70, 0.02).expect("valid normal");
        for _ in 0..10 {
            let value: f64 = low.sample(&mut rng);
            monitor.record_prediction_at(
                model,
                scored_prediction(value, 1.0, 10.0),
                comparison_window.start + Duration::seconds(30),
            );
        }

        let report = monitor
            .detect_model_drift(model, baseline_window, comparison_window)
            .expect("tracked model");
        assert!(report.is_drift);
        assert!(report.affected_metrics.contains(&"accuracy".to_string()));
        assert!(!report.insufficient_data);

        // A drift alert was recorded for asynchronous consumption.
        assert!(monitor
            .alerts_for(model)
            .iter()
            .any(|a| a.kind == AlertKind::Drift));
    }

    #[test]
    fn drift_with_empty_window_flags_insufficient_data() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        monitor.record_prediction(model, scored_prediction(0.9, 1.0, 10.0));

        let empty = TimeWindow::new(
            Utc::now() - Duration::days(10),
            Utc::now() - Duration::days(9),
        );
        let recent = TimeWindow::last_minutes(5);
        let report = monitor
            .detect_model_drift(model, empty, recent)
            .expect("tracked model");
        assert!(report.insufficient_data);
        assert!(!report.is_drift);
    }

    #[test]
    fn drift_on_untracked_model_is_not_found() {
        let monitor = ModelMonitor::new();
        let err = monitor
            .detect_model_drift(
                Uuid::new_v4(),
                TimeWindow::last_minutes(10),
                TimeWindow::last_minutes(5),
            )
            .unwrap_err();
        assert!(matches!(err, MonitorError::ModelNotTracked(_)));
    }

    #[test]
    fn performance_report_aggregates_and_recommends() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        for _ in 0..5 {
            monitor.record_prediction(model, scored_prediction(0.4, 1.0, 2000.0));
        }

        let report = monitor
            .performance_report(model, TimeWindow::last_minutes(10))
            .expect("tracked model");
        assert_eq!(report.stats.predictions, 5);
        assert!(report.uptime > 0.0 && report.uptime <= 1.0);
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.contains("retraining")),
            "low accuracy must recommend retraining"
        );
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.contains("latency")),
            "slow serving must recommend profiling"
        );
    }

    #[test]
    fn resolve_alert_flips_flag_and_unknown_id_errors() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        monitor.record_prediction(model, scored_prediction(0.1, 1.0, 10.0));

        let alert = monitor.alerts_for(model).pop().expect("alert raised");
        let resolved = monitor.resolve_alert(alert.id).expect("resolves");
        assert!(resolved.resolved);

        let err = monitor.resolve_alert(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, MonitorError::AlertNotFound(_)));
    }

    #[test]
    fn record_error_contributes_to_error_rate() {
        let monitor = ModelMonitor::new();
        let model = Uuid::new_v4();
        for _ in 0..9 {
            monitor.record_prediction(model, prediction(1.0));
        }
        monitor.record_error(model, "backend unreachable");

        let report = monitor
            .performance_report(model, TimeWindow::last_minutes(5))
            .expect("tracked model");
        assert!((report.stats.error_rate - 0.1).abs() < 1e-9);
        assert!(monitor
            .alerts_for(model)
            .iter()
            .any(|a| a.kind == AlertKind::Error));
    }
}

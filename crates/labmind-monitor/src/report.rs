//! Performance reports with operator recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labmind_core::{ModelId, TimeWindow};

use crate::drift::PeriodStats;
use crate::types::MonitorThresholds;

/// Alert volume at or above which the report recommends an investigation.
const ALERT_VOLUME_CONCERN: usize = 5;

/// Aggregated performance over a period, with recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Model reported on.
    pub model_id: ModelId,
    /// Reporting period.
    pub period: TimeWindow,
    /// Aggregates over the period's buckets.
    pub stats: PeriodStats,
    /// Minutes with recorded activity over period minutes, capped at 1.0.
    pub uptime: f64,
    /// Alerts raised for this model within the period.
    pub alert_count: usize,
    /// Operator guidance keyed off threshold breaches and alert volume.
    pub recommendations: Vec<String>,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}

/// Build a report from period aggregates.
pub(crate) fn build(
    model_id: ModelId,
    period: TimeWindow,
    stats: PeriodStats,
    alert_count: usize,
    thresholds: &MonitorThresholds,
) -> PerformanceReport {
    let period_minutes = period.minutes();
    let uptime = if period_minutes == 0 {
        if stats.active_minutes > 0 {
            1.0
        } else {
            0.0
        }
    } else {
        (stats.active_minutes as f64 / period_minutes as f64).min(1.0)
    };

    let mut recommendations = Vec::new();
    if let Some(accuracy) = stats.accuracy {
        if accuracy < thresholds.accuracy_min {
            recommendations.push(format!(
                "Average accuracy {:.3} is below the {:.3} target: schedule retraining with recent data.",
                accuracy, thresholds.accuracy_min
            ));
        }
    }
    if let Some(latency) = stats.latency_ms {
        if latency > thresholds.latency_max_ms {
            recommendations.push(format!(
                "Average latency {:.0}ms exceeds the {:.0}ms budget: profile the serving path or scale resources.",
                latency, thresholds.latency_max_ms
            ));
        }
    }
    if stats.error_rate > thresholds.error_rate_max {
        recommendations.push(format!(
            "Error rate {:.3} exceeds the {:.3} budget: check input validation and backend health.",
            stats.error_rate, thresholds.error_rate_max
        ));
    }
    if alert_count >= ALERT_VOLUME_CONCERN {
        recommendations.push(format!(
            "{alert_count} alerts in the period: investigate instability or revisit alert thresholds."
        ));
    }

    PerformanceReport {
        model_id,
        period,
        stats,
        uptime,
        alert_count,
        recommendations,
        generated_at: Utc::now(),
    }
}

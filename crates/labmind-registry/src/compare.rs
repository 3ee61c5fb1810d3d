//! Metric-by-metric model comparison.

use serde::{Deserialize, Serialize};

use labmind_core::ModelId;

use crate::types::ModelVersion;

/// Which side a metric favored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// First model had the better value.
    First,
    /// Second model had the better value.
    Second,
    /// Values were equal; ties are reported explicitly, never hidden.
    Tie,
}

/// One metric's comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricComparison {
    /// Metric name.
    pub metric: String,
    /// First model's value.
    pub first: f64,
    /// Second model's value.
    pub second: f64,
    /// Which side won. Higher is treated as better for every metric except
    /// those named like costs (latency, error, loss, mse, mae), where lower
    /// wins.
    pub winner: Winner,
    /// Absolute difference between the values.
    pub margin: f64,
}

/// Full comparison between two model versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    /// First model id.
    pub first: ModelId,
    /// Second model id.
    pub second: ModelId,
    /// Shared metrics, compared one by one.
    pub metrics: Vec<MetricComparison>,
    /// Metric names present on only one side; excluded from comparison.
    pub unshared: Vec<String>,
}

/// Metrics where a smaller value is the better one.
fn lower_is_better(metric: &str) -> bool {
    const COST_MARKERS: [&str; 5] = ["latency", "error", "loss", "mse", "mae"];
    let lower = metric.to_lowercase();
    COST_MARKERS.iter().any(|m| lower.contains(m))
}

/// Compare two versions over the intersection of their metrics.
pub fn compare(first: &ModelVersion, second: &ModelVersion) -> ModelComparison {
    let mut shared: Vec<&String> = first
        .metrics
        .keys()
        .filter(|k| second.metrics.contains_key(*k))
        .collect();
    shared.sort();

    let mut unshared: Vec<String> = first
        .metrics
        .keys()
        .filter(|k| !second.metrics.contains_key(*k))
        .chain(
            second
                .metrics
                .keys()
                .filter(|k| !first.metrics.contains_key(*k)),
        )
        .cloned()
        .collect();
    unshared.sort();

    let metrics = shared
        .into_iter()
        .map(|name| {
            let a = first.metrics[name];
            let b = second.metrics[name];
            let winner = if a == b {
                Winner::Tie
            } else if (a > b) != lower_is_better(name) {
                Winner::First
            } else {
                Winner::Second
            };
            MetricComparison {
                metric: name.clone(),
                first: a,
                second: b,
                winner,
                margin: (a - b).abs(),
            }
        })
        .collect();

    ModelComparison {
        first: first.id,
        second: second.id,
        metrics,
        unshared,
    }
}

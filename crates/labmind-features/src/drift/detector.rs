//! Per-feature drift evaluation over two vector samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labmind_core::GroupId;

use crate::types::{FeatureGroup, FeatureType, FeatureVector};

use super::ks::ks_statistic;
use super::psi::population_stability_index;

/// Statistic used for a feature's drift score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    /// Kolmogorov–Smirnov over numerical values.
    KolmogorovSmirnov,
    /// Population Stability Index over categorical values.
    PopulationStability,
}

/// Thresholds for flagging drift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureDriftConfig {
    /// A feature is flagged when its score exceeds this.
    pub threshold: f64,
}

impl Default for FeatureDriftConfig {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

/// Drift verdict for one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDrift {
    /// Feature name.
    pub feature: String,
    /// Statistic used.
    pub method: DriftMethod,
    /// Drift score; 1.0 when either sample was empty.
    pub score: f64,
    /// Whether the score exceeded the threshold.
    pub drifted: bool,
    /// True when either window held no usable values for this feature.
    pub insufficient_data: bool,
}

/// Drift verdicts for every feature of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDriftReport {
    /// Group evaluated.
    pub group_id: GroupId,
    /// Per-feature results, in schema order.
    pub features: Vec<FeatureDrift>,
    /// When the evaluation ran.
    pub evaluated_at: DateTime<Utc>,
}

impl FeatureDriftReport {
    /// Names of features flagged as drifted.
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.drifted)
            .map(|f| f.feature.as_str())
            .collect()
    }

    /// Whether any feature drifted.
    pub fn has_drift(&self) -> bool {
        self.features.iter().any(|f| f.drifted)
    }
}

/// Evaluate drift for every feature of `group` between two vector samples.
///
/// Null values are skipped; a feature whose usable values are empty on either
/// side scores 1.0 with `insufficient_data` set, per the store's contract
/// that thin data is a result flag rather than an error.
pub fn detect_drift(
    group: &FeatureGroup,
    baseline: &[FeatureVector],
    comparison: &[FeatureVector],
    config: &FeatureDriftConfig,
) -> FeatureDriftReport {
    let features = group
        .definitions
        .iter()
        .map(|def| match def.feature_type {
            FeatureType::Numerical => {
                let base = numeric_values(baseline, &def.name);
                let cmp = numeric_values(comparison, &def.name);
                score_feature(
                    &def.name,
                    DriftMethod::KolmogorovSmirnov,
                    base.is_empty() || cmp.is_empty(),
                    || ks_statistic(&base, &cmp),
                    config,
                )
            }
            FeatureType::Categorical => {
                let base = text_values(baseline, &def.name);
                let cmp = text_values(comparison, &def.name);
                score_feature(
                    &def.name,
                    DriftMethod::PopulationStability,
                    base.is_empty() || cmp.is_empty(),
                    || population_stability_index(&base, &cmp),
                    config,
                )
            }
        })
        .collect();

    FeatureDriftReport {
        group_id: group.id,
        features,
        evaluated_at: Utc::now(),
    }
}

fn score_feature(
    name: &str,
    method: DriftMethod,
    insufficient: bool,
    score_fn: impl FnOnce() -> f64,
    config: &FeatureDriftConfig,
) -> FeatureDrift {
    if insufficient {
        return FeatureDrift {
            feature: name.to_string(),
            method,
            score: 1.0,
            drifted: false,
            insufficient_data: true,
        };
    }
    let score = score_fn();
    FeatureDrift {
        feature: name.to_string(),
        method,
        score,
        drifted: score > config.threshold,
        insufficient_data: false,
    }
}

fn numeric_values(vectors: &[FeatureVector], feature: &str) -> Vec<f64> {
    vectors
        .iter()
        .filter_map(|v| v.values.get(feature).and_then(|val| val.as_number()))
        .collect()
}

fn text_values(vectors: &[FeatureVector], feature: &str) -> Vec<String> {
    vectors
        .iter()
        .filter_map(|v| {
            v.values
                .get(feature)
                .and_then(|val| val.as_text())
                .map(str::to_owned)
        })
        .collect()
}

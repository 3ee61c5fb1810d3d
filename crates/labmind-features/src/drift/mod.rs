//! Feature drift detection.
//!
//! Numerical features are compared with a two-sample Kolmogorov–Smirnov
//! statistic, categorical features with a Population Stability Index. A
//! feature is flagged when its score exceeds the configured threshold; an
//! empty sample on either side yields score 1.0 tagged `insufficient_data`
//! rather than an error.

mod detector;
mod ks;
mod psi;

pub use detector::{
    detect_drift, DriftMethod, FeatureDrift, FeatureDriftConfig, FeatureDriftReport,
};
pub use ks::ks_statistic;
pub use psi::{population_stability_index, ZERO_FREQUENCY_FLOOR};

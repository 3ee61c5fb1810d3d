//! Alert records raised by the monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use labmind_core::{AlertId, ModelId};

/// What triggered an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A threshold breach on a rolling metric.
    Performance,
    /// Model drift detected between two periods.
    Drift,
    /// A prediction value far outside the recent sample distribution.
    Anomaly,
    /// Errors recorded against the model.
    Error,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Performance => "performance",
            Self::Drift => "drift",
            Self::Anomaly => "anomaly",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Minor breach; worth a look.
    Low,
    /// Sustained or moderate breach.
    Medium,
    /// Large breach; intervention advised.
    High,
    /// Model effectively failing its contract.
    Critical,
}

impl Severity {
    /// Scale severity to the relative magnitude of a breach.
    ///
    /// `ratio` is breach size over the threshold (0.0 = at the line).
    pub fn from_breach_ratio(ratio: f64) -> Self {
        if ratio >= 0.5 {
            Self::Critical
        } else if ratio >= 0.25 {
            Self::High
        } else if ratio >= 0.1 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A monitoring alert, consumed asynchronously by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: AlertId,
    /// Model the alert concerns.
    pub model_id: ModelId,
    /// What triggered it.
    pub kind: AlertKind,
    /// How bad the breach was.
    pub severity: Severity,
    /// Human-readable description of the condition.
    pub message: String,
    /// Whether an operator has resolved it.
    pub resolved: bool,
    /// When the condition was observed.
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Create an unresolved alert observed now.
    pub fn new(
        model_id: ModelId,
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            kind,
            severity,
            message: message.into(),
            resolved: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn breach_ratio_scales_severity() {
        assert_eq!(Severity::from_breach_ratio(0.05), Severity::Low);
        assert_eq!(Severity::from_breach_ratio(0.15), Severity::Medium);
        assert_eq!(Severity::from_breach_ratio(0.3), Severity::High);
        assert_eq!(Severity::from_breach_ratio(0.9), Severity::Critical);
    }
}

//! labmind model monitor
//!
//! Records live predictions into per-minute metric buckets, raises alerts on
//! anomalies and threshold breaches, detects model drift between time
//! periods, and produces performance reports.
//!
//! Monitoring conditions never throw: they are recorded as [`Alert`]s for
//! asynchronous consumption. Thin data in a drift query is reported through
//! the `insufficient_data` flag on the result, keeping partial context for
//! the caller.

pub mod alerts;
pub mod drift;
pub mod error;
pub mod monitor;
pub mod report;
pub mod types;

pub use alerts::{Alert, AlertKind, Severity};
pub use drift::{ModelDriftReport, PeriodStats};
pub use error::{MonitorError, MonitorResult};
pub use monitor::{ModelMonitor, PredictionRecord};
pub use report::PerformanceReport;
pub use types::{MetricBucket, MonitorThresholds};

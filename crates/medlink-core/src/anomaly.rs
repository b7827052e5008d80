//! Anomaly result types.
//!
//! The detection logic lives in `medlink-rules`; the result type is shared
//! here so it can travel on the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clinical risk level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One detected anomaly: the triggering condition and the recommended
/// clinical action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub severity: Severity,
    /// Human text describing the triggering condition and its value.
    pub finding: String,
    /// Clinical action text.
    pub recommendation: String,
    pub detected_at: DateTime<Utc>,
}

impl AnomalyResult {
    pub fn new(
        severity: Severity,
        finding: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            finding: finding.into(),
            recommendation: recommendation.into(),
            detected_at: Utc::now(),
        }
    }
}

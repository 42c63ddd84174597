//! Anomaly types: detection methods, tier scores, and the Anomaly record
//!
//! One `Anomaly` is created per run per flagged point and is immutable
//! after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

// ============================================================================
// Detection Methods
// ============================================================================

/// Which detector tier contributed to an anomaly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Tier 1: median/MAD modified z-score.
    RobustZScore,
    /// Tier 2: seasonal forecast confidence interval.
    SeasonalForecast,
    /// Tier 3: isolation forest over the contextual feature vector.
    IsolationForest,
    /// Fallback prior when history is too short for per-KPI detection.
    PopulationPrior,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::RobustZScore => write!(f, "robust_zscore"),
            DetectionMethod::SeasonalForecast => write!(f, "seasonal_forecast"),
            DetectionMethod::IsolationForest => write!(f, "isolation_forest"),
            DetectionMethod::PopulationPrior => write!(f, "population_prior"),
        }
    }
}

/// Direction of a detected deviation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyDirection {
    Up,
    Down,
}

// ============================================================================
// Tier Score
// ============================================================================

/// Per-tier detection score before ensemble combination.
///
/// `score` is normalized to [0, 1]; the ensemble combines tier scores with
/// configured weights. Not every tier runs on every series (insufficient
/// history skips Tier 2), so the ensemble renormalizes over present tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierScore {
    pub method: DetectionMethod,
    /// Normalized anomaly score in [0, 1].
    pub score: f64,
    pub direction: AnomalyDirection,
    /// Short human-readable detail ("z=4.2", "outside 95% CI", ...).
    pub detail: String,
}

// ============================================================================
// Anomaly Record
// ============================================================================

/// A detected anomaly on a single KPI point. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub kpi_name: String,
    pub timestamp: DateTime<Utc>,
    /// Relative deviation from expectation (e.g. -0.4 for a 40% drop).
    pub magnitude: f64,
    pub direction: AnomalyDirection,
    pub severity: Severity,
    /// Combined ensemble confidence in [0, 1].
    pub confidence: f64,
    /// Tiers that contributed to the detection.
    pub methods: Vec<DetectionMethod>,
    /// Human-readable explanation assembled from tier details.
    pub explanation: String,
}

impl Anomaly {
    /// Score used by root-cause tracing and content urgency: confidence
    /// weighted by severity.
    pub fn weighted_score(&self) -> f64 {
        self.confidence * self.severity.urgency_weight()
    }
}

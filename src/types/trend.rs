//! Trend types: timeframe windows, direction, effect size, acceleration
//!
//! Trends are recomputed fully each run — there is no incremental mutation.

use serde::{Deserialize, Serialize};

use super::SamplingFrequency;

// ============================================================================
// Timeframe
// ============================================================================

/// Comparison window for trend analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Week over week.
    WoW,
    /// Month over month.
    MoM,
    /// Quarter over quarter.
    QoQ,
    /// Year over year.
    YoY,
}

impl Timeframe {
    /// Window length in calendar days.
    pub fn window_days(self) -> usize {
        match self {
            Timeframe::WoW => 7,
            Timeframe::MoM => 30,
            Timeframe::QoQ => 90,
            Timeframe::YoY => 365,
        }
    }

    /// Window length in points for a given sampling frequency.
    pub fn window_points(self, frequency: SamplingFrequency) -> usize {
        frequency.points_per_days(self.window_days()).max(2)
    }

    /// Long-horizon timeframes report compounding growth instead of a
    /// two-sample mean comparison.
    pub fn is_long_horizon(self) -> bool {
        matches!(self, Timeframe::QoQ | Timeframe::YoY)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::WoW => write!(f, "WoW"),
            Timeframe::MoM => write!(f, "MoM"),
            Timeframe::QoQ => write!(f, "QoQ"),
            Timeframe::YoY => write!(f, "YoY"),
        }
    }
}

// ============================================================================
// Classification buckets
// ============================================================================

/// Trend direction classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
    /// Windowed coefficient of variation above threshold — no stable
    /// directional signal.
    Volatile,
}

/// Standardized effect-size bucket from Cohen's d.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    #[default]
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    /// Conventional |d| buckets: 0.2 / 0.5 / 0.8.
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d >= 0.8 {
            EffectSize::Large
        } else if d >= 0.5 {
            EffectSize::Medium
        } else if d >= 0.2 {
            EffectSize::Small
        } else {
            EffectSize::Negligible
        }
    }
}

/// Second-difference acceleration bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    Accelerating,
    Decelerating,
    #[default]
    Steady,
}

// ============================================================================
// Trend Record
// ============================================================================

/// Trend analysis result for one KPI over one timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub kpi_name: String,
    pub timeframe: Timeframe,
    pub direction: TrendDirection,
    /// Relative change of current vs prior window mean (0.02 = +2%).
    pub magnitude: f64,
    /// True only when the two-sample test reached p < 0.05.
    pub significant: bool,
    /// Two-tailed p-value of the window comparison (1.0 when not computed).
    pub p_value: f64,
    pub effect_size: EffectSize,
    pub acceleration: Acceleration,
    /// OLS slope per point over the analysis window (medium-term only).
    pub slope: Option<f64>,
    /// OLS fit quality in [0, 1] (medium-term only).
    pub r_squared: Option<f64>,
    /// Per-period compounding growth rate (long-horizon only).
    pub compound_rate: Option<f64>,
    /// Near-zero prior baseline — magnitude is not a meaningful ratio.
    #[serde(default)]
    pub indeterminate: bool,
}

impl Trend {
    /// Indeterminate placeholder for near-zero baselines.
    pub fn indeterminate(kpi_name: &str, timeframe: Timeframe) -> Self {
        Self {
            kpi_name: kpi_name.to_string(),
            timeframe,
            direction: TrendDirection::Flat,
            magnitude: 0.0,
            significant: false,
            p_value: 1.0,
            effect_size: EffectSize::Negligible,
            acceleration: Acceleration::Steady,
            slope: None,
            r_squared: None,
            compound_rate: None,
            indeterminate: true,
        }
    }
}

//! Engine configuration - all analytical thresholds as tunable TOML values
//!
//! Every weight and threshold the pipeline uses is a field in this module.
//! Each struct implements `Default` with the documented constants, so an
//! absent config file means documented behavior, not failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::SensitivityProfile;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one engine deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PULSE_CONFIG` env var
/// 2. `./engine_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Anomaly detector ensemble tuning.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Trend analysis thresholds.
    #[serde(default)]
    pub trend: TrendConfig,

    /// Correlation engine thresholds.
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Recommendation pipeline tuning.
    #[serde(default)]
    pub recommend: RecommendConfig,

    /// Content selection / briefing tuning.
    #[serde(default)]
    pub briefing: BriefingConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PULSE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from PULSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PULSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PULSE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("engine_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./engine_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./engine_config.toml, using defaults");
                }
            }
        }

        info!("No engine_config.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigFileError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigFileError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the founder's sensitivity profile to the detection surface.
    ///
    /// Presets scale the ensemble threshold; `Custom` leaves the explicit
    /// TOML values untouched.
    pub fn with_sensitivity(mut self, profile: SensitivityProfile) -> Self {
        let scale = profile.threshold_scale();
        if profile != SensitivityProfile::Custom {
            self.detection.anomaly_threshold =
                (self.detection.anomaly_threshold * scale).clamp(0.05, 0.99);
            self.detection.robust_z_threshold *= scale;
        }
        self
    }

    /// Range-check every weight and threshold.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let dw = &self.detection.tier_weights;
        let sum = dw.statistical + dw.seasonal + dw.multivariate;
        if !(0.99..=1.01).contains(&sum) {
            return Err(ConfigFileError::Invalid(format!(
                "detection.tier_weights must sum to 1.0, got {sum:.3}"
            )));
        }
        let rw = &self.recommend.weights;
        let sum = rw.urgency + rw.impact + rw.feasibility + rw.confidence;
        if !(0.99..=1.01).contains(&sum) {
            return Err(ConfigFileError::Invalid(format!(
                "recommend.weights must sum to 1.0, got {sum:.3}"
            )));
        }
        let cw = &self.briefing.weights;
        let sum = cw.urgency + cw.impact + cw.relevance + cw.freshness + cw.actionability;
        if !(0.99..=1.01).contains(&sum) {
            return Err(ConfigFileError::Invalid(format!(
                "briefing.weights must sum to 1.0, got {sum:.3}"
            )));
        }
        if !(0.0..1.0).contains(&self.detection.anomaly_threshold) {
            return Err(ConfigFileError::Invalid(
                "detection.anomaly_threshold must be in [0, 1)".to_string(),
            ));
        }
        if self.correlation.max_lag == 0 {
            return Err(ConfigFileError::Invalid(
                "correlation.max_lag must be >= 1".to_string(),
            ));
        }
        if self.briefing.reading_wpm == 0 {
            return Err(ConfigFileError::Invalid(
                "briefing.reading_wpm must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Detection
// ============================================================================

/// Ensemble weights for the three detector tiers. Must sum to 1.0; the
/// ensemble renormalizes at runtime when a tier is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub statistical: f64,
    pub seasonal: f64,
    pub multivariate: f64,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            statistical: 0.15,
            seasonal: 0.55,
            multivariate: 0.30,
        }
    }
}

/// Combined-score boundaries for severity bucketing (descending).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBuckets {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityBuckets {
    fn default() -> Self {
        Self {
            critical: 0.85,
            high: 0.70,
            medium: 0.55,
        }
    }
}

/// Tier 2 seasonal model tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    /// Normal quantile for the forecast confidence interval (1.96 = 95%).
    pub interval_z: f64,
    /// Seasons of history required before Tier 2 runs.
    pub min_history_seasons: usize,
    /// Refit when the cached model is older than this many runs.
    pub refit_max_age_runs: u32,
    /// Refit when rolling mean absolute percentage error exceeds this.
    pub refit_error_threshold: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            interval_z: 1.96,
            min_history_seasons: 2,
            refit_max_age_runs: 7,
            refit_error_threshold: 0.25,
        }
    }
}

/// Tier 3 isolation forest tuning. The seed keeps runs deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    pub trees: usize,
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            trees: 100,
            sample_size: 64,
            seed: 47,
        }
    }
}

/// Population-prior fallback for KPIs with too little history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StaticThreshold {
    pub mean: f64,
    pub std: f64,
}

/// Anomaly detector ensemble configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    #[serde(default)]
    pub tier_weights: TierWeights,

    /// Combined ensemble score required to emit an anomaly.
    pub anomaly_threshold: f64,

    #[serde(default)]
    pub severity: SeverityBuckets,

    /// Modified z-score cutoff for the Tier 1 fast path (Iglewicz-Hoaglin
    /// convention: 3.5).
    pub robust_z_threshold: f64,

    #[serde(default)]
    pub seasonal: SeasonalConfig,

    #[serde(default)]
    pub isolation: IsolationConfig,

    /// Maximum consecutive missing points repaired by forward-fill /
    /// interpolation before the KPI is declared a data-quality failure.
    pub max_fill_gap: usize,

    /// Confidence penalty per filled point.
    pub fill_confidence_penalty: f64,

    /// Minimum points for any detection at all; below this the population
    /// prior applies (when configured for the KPI).
    pub min_history_points: usize,

    /// Per-KPI static threshold table used as the population-level prior.
    #[serde(default)]
    pub static_thresholds: BTreeMap<String, StaticThreshold>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tier_weights: TierWeights::default(),
            anomaly_threshold: 0.50,
            severity: SeverityBuckets::default(),
            robust_z_threshold: 3.5,
            seasonal: SeasonalConfig::default(),
            isolation: IsolationConfig::default(),
            max_fill_gap: 3,
            fill_confidence_penalty: 0.10,
            min_history_points: 8,
            static_thresholds: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Trend
// ============================================================================

/// Trend analysis thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Minimum relative window-over-window change to call a direction.
    pub min_change_pct: f64,
    /// Significance level for the two-sample test.
    pub significance_alpha: f64,
    /// Coefficient of variation above which a window is Volatile.
    pub volatility_cv: f64,
    /// Moving-average window for the acceleration series.
    pub smoothing_window: usize,
    /// Dead zone on the smoothed second difference (relative to the mean)
    /// inside which acceleration is Steady.
    pub accel_dead_zone: f64,
    /// Baselines with |mean| below this are indeterminate.
    pub zero_baseline_epsilon: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_change_pct: 0.02,
            significance_alpha: 0.05,
            volatility_cv: 0.35,
            smoothing_window: 3,
            accel_dead_zone: 0.005,
            zero_baseline_epsilon: 1e-6,
        }
    }
}

// ============================================================================
// Correlation
// ============================================================================

/// Correlation engine thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Maximum lag (in sampling periods) searched for cross-correlation.
    pub max_lag: u32,
    /// Minimum |Pearson r| at the best lag for an edge candidate.
    pub min_abs_r: f64,
    /// Significance level for the lagged-causality F-test.
    pub causality_alpha: f64,
    /// Minimum overlapping samples for a pair to be considered.
    pub min_overlap: usize,
    /// PageRank damping factor.
    pub pagerank_damping: f64,
    /// PageRank iteration cap.
    pub pagerank_max_iter: usize,
    /// PageRank convergence epsilon (L1 delta).
    pub pagerank_epsilon: f64,
    /// Fraction of pattern conditions required for a match.
    pub pattern_match_fraction: f64,
    /// Tolerance (in sampling periods) when matching a predecessor anomaly
    /// to an edge lag during root-cause tracing.
    pub root_cause_lag_tolerance: u32,
    /// Joint-anomaly score above which the multivariate pass attributes
    /// contributors.
    pub joint_anomaly_threshold: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            max_lag: 14,
            min_abs_r: 0.5,
            causality_alpha: 0.05,
            min_overlap: 30,
            pagerank_damping: 0.85,
            pagerank_max_iter: 50,
            pagerank_epsilon: 1e-6,
            pattern_match_fraction: 0.75,
            root_cause_lag_tolerance: 2,
            joint_anomaly_threshold: 0.65,
        }
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// Priority weights: priority = 100 * (w_u*urgency + w_i*impact +
/// w_f*feasibility + w_c*confidence). Independent from the content
/// selection weights by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub urgency: f64,
    pub impact: f64,
    pub feasibility: f64,
    pub confidence: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency: 0.35,
            impact: 0.30,
            feasibility: 0.15,
            confidence: 0.20,
        }
    }
}

/// Enrichment capability budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Only the top K ranked candidates are enriched.
    pub top_k: usize,
    /// Hard cap on enrichment calls per run.
    pub budget_per_run: usize,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            budget_per_run: 3,
            timeout_ms: 4_000,
        }
    }
}

/// Bounded confidence-calibration updates from founder feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Step applied per feedback event.
    pub step: f64,
    /// Clamp bounds on the accumulated adjustment.
    pub min_adjustment: f64,
    pub max_adjustment: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            step: 0.02,
            min_adjustment: -0.20,
            max_adjustment: 0.20,
        }
    }
}

/// Recommendation pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    #[serde(default)]
    pub weights: PriorityWeights,

    /// Final truncation cap.
    pub max_recommendations: usize,

    /// Diversity cap per category before truncation.
    pub per_category_cap: usize,

    /// Fixed confidence of deterministic rule hits.
    pub rule_confidence: f64,

    /// Base confidence of scenario/pattern candidates.
    pub pattern_confidence: f64,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Cooldown between repeated critical recommendations from the same
    /// rule, in hours.
    pub critical_cooldown_hours: i64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            max_recommendations: 5,
            per_category_cap: 2,
            rule_confidence: 0.90,
            pattern_confidence: 0.60,
            enrichment: EnrichmentConfig::default(),
            calibration: CalibrationConfig::default(),
            critical_cooldown_hours: 24,
        }
    }
}

// ============================================================================
// Briefing
// ============================================================================

/// Content scoring weights: score = 100 * (w_u*urgency + w_i*impact +
/// w_r*relevance + w_f*freshness + w_a*actionability).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentWeights {
    pub urgency: f64,
    pub impact: f64,
    pub relevance: f64,
    pub freshness: f64,
    pub actionability: f64,
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            urgency: 0.30,
            impact: 0.25,
            relevance: 0.20,
            freshness: 0.15,
            actionability: 0.10,
        }
    }
}

/// Per-type selection caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerTypeCaps {
    pub task: usize,
    pub anomaly: usize,
    pub meeting: usize,
    pub message: usize,
    pub insight: usize,
    pub decision: usize,
    pub kpi_snapshot: usize,
}

impl Default for PerTypeCaps {
    fn default() -> Self {
        Self {
            task: 3,
            anomaly: 3,
            meeting: 2,
            message: 2,
            insight: 2,
            decision: 1,
            kpi_snapshot: 2,
        }
    }
}

/// Bounded engagement personalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Events required before the factor departs from neutral.
    pub min_history: usize,
    /// Clamp bounds on the multiplier.
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            min_factor: 0.8,
            max_factor: 1.2,
        }
    }
}

/// Content selection / briefing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefingConfig {
    #[serde(default)]
    pub weights: ContentWeights,

    /// Global item cap across all sections.
    pub total_cap: usize,

    #[serde(default)]
    pub per_type_caps: PerTypeCaps,

    /// Category-diversity cap: max items per section before trimming.
    pub per_section_cap: usize,

    /// Read-time target in seconds.
    pub read_time_target_secs: u32,

    /// Reading speed for the estimate.
    pub reading_wpm: u32,

    /// Items a mandatory section keeps through read-time trimming.
    pub min_mandatory_items: usize,

    /// Multiplier applied to the favored categories of each briefing kind.
    pub kind_multiplier: f64,

    /// Urgency keywords scanned in messages and meeting descriptions.
    #[serde(default = "default_urgency_keywords")]
    pub urgency_keywords: Vec<String>,

    #[serde(default)]
    pub engagement: EngagementConfig,
}

fn default_urgency_keywords() -> Vec<String> {
    [
        "urgent", "asap", "blocker", "blocked", "deadline", "outage", "churn", "cancel",
        "term sheet", "due diligence", "payroll",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            weights: ContentWeights::default(),
            total_cap: 7,
            per_type_caps: PerTypeCaps::default(),
            per_section_cap: 3,
            read_time_target_secs: 180,
            reading_wpm: 200,
            min_mandatory_items: 1,
            kind_multiplier: 1.2,
            urgency_keywords: default_urgency_keywords(),
            engagement: EngagementConfig::default(),
        }
    }
}

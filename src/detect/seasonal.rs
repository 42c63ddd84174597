//! Tier 2: seasonal forecasting with a cached, conditionally refit model
//!
//! An additive decomposition: OLS trend over the training window plus
//! per-position seasonal indices, with the residual standard deviation
//! driving a forecast confidence interval. The fitted model is cached per
//! (tenant, KPI) and refit only when it goes stale or its rolling one-step
//! prediction error degrades — never unconditionally every run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SeasonalConfig;
use crate::error::EngineError;
use crate::stats;
use crate::types::{AnomalyDirection, DetectionMethod, TierScore};

// ============================================================================
// Model
// ============================================================================

/// A fitted additive seasonal model. Serializable so the engine store can
/// cache it across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalModel {
    pub season_len: usize,
    /// Additive index per position in the cycle (sums to ~0).
    pub indices: Vec<f64>,
    /// OLS intercept of the deseasonalized training series.
    pub intercept: f64,
    /// OLS slope per point.
    pub slope: f64,
    /// Residual standard deviation over the training window.
    pub resid_std: f64,
    /// Training series length (forecast origin).
    pub train_len: usize,
    /// Run index at fit time, for staleness checks.
    pub fitted_at_run: u64,
    /// Exponential moving average of one-step absolute percentage error.
    pub rolling_ape: f64,
    /// One-step predictions scored since fitting.
    pub scored: u32,
}

impl SeasonalModel {
    /// Fit over `values`; requires `min_seasons` full cycles.
    pub fn fit(
        kpi: &str,
        values: &[f64],
        season_len: usize,
        min_seasons: usize,
        run_index: u64,
    ) -> Result<Self, EngineError> {
        let needed = season_len * min_seasons;
        if values.len() < needed {
            return Err(EngineError::ModelFit {
                kpi: kpi.to_string(),
                reason: format!("{} points, need {needed} for seasonal fit", values.len()),
            });
        }

        // Trend on the raw series first
        let trend_fit = stats::ols_fit(values);

        // Seasonal indices from detrended residuals, averaged per position
        let mut sums = vec![0.0_f64; season_len];
        let mut counts = vec![0usize; season_len];
        for (i, &v) in values.iter().enumerate() {
            let detrended = v - (trend_fit.slope * i as f64 + trend_fit.intercept);
            sums[i % season_len] += detrended;
            counts[i % season_len] += 1;
        }
        let mut indices: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect();
        // Recenter so indices sum to zero
        let idx_mean = stats::mean(&indices);
        for idx in &mut indices {
            *idx -= idx_mean;
        }

        // Residuals of the full additive model
        let mut resid = Vec::with_capacity(values.len());
        for (i, &v) in values.iter().enumerate() {
            let fitted =
                trend_fit.slope * i as f64 + trend_fit.intercept + indices[i % season_len];
            resid.push(v - fitted);
        }
        let resid_std = stats::std_dev(&resid);

        if !resid_std.is_finite() || !trend_fit.slope.is_finite() {
            return Err(EngineError::ModelFit {
                kpi: kpi.to_string(),
                reason: "non-finite fit parameters".to_string(),
            });
        }

        Ok(Self {
            season_len,
            indices,
            intercept: trend_fit.intercept,
            slope: trend_fit.slope,
            resid_std,
            train_len: values.len(),
            fitted_at_run: run_index,
            rolling_ape: 0.0,
            scored: 0,
        })
    }

    /// Point forecast for absolute series index `i`.
    pub fn forecast(&self, i: usize) -> f64 {
        self.slope * i as f64 + self.intercept + self.indices[i % self.season_len]
    }

    /// Record a one-step absolute percentage error into the rolling EMA.
    pub fn observe_error(&mut self, actual: f64, expected: f64) {
        if expected.abs() < 1e-9 {
            return;
        }
        let ape = ((actual - expected) / expected).abs();
        // EMA with alpha 0.3: recent errors dominate, old fits decay
        self.rolling_ape = if self.scored == 0 {
            ape
        } else {
            0.3 * ape + 0.7 * self.rolling_ape
        };
        self.scored += 1;
    }

    /// Whether the cached model should be discarded and refit.
    pub fn needs_refit(&self, run_index: u64, cfg: &SeasonalConfig) -> bool {
        let stale = run_index.saturating_sub(self.fitted_at_run) > u64::from(cfg.refit_max_age_runs);
        let drifted = self.scored >= 3 && self.rolling_ape > cfg.refit_error_threshold;
        stale || drifted
    }
}

// ============================================================================
// Model cache seam
// ============================================================================

/// Cache of fitted seasonal models keyed by (tenant, KPI). Implemented by
/// the sled engine store and by an in-memory map for tests.
pub trait SeasonalCache: Send + Sync {
    fn get_model(&self, tenant: &str, kpi: &str) -> Option<SeasonalModel>;
    fn put_model(&self, tenant: &str, kpi: &str, model: &SeasonalModel);
}

/// In-memory cache for tests and single-shot runs.
#[derive(Debug, Default)]
pub struct MemorySeasonalCache {
    models: std::sync::Mutex<std::collections::HashMap<String, SeasonalModel>>,
}

impl SeasonalCache for MemorySeasonalCache {
    fn get_model(&self, tenant: &str, kpi: &str) -> Option<SeasonalModel> {
        self.models
            .lock()
            .ok()?
            .get(&format!("{tenant}:{kpi}"))
            .cloned()
    }

    fn put_model(&self, tenant: &str, kpi: &str, model: &SeasonalModel) {
        if let Ok(mut map) = self.models.lock() {
            map.insert(format!("{tenant}:{kpi}"), model.clone());
        }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Seasonal forecast detector with conditional refit.
pub struct SeasonalDetector<'a> {
    cfg: &'a SeasonalConfig,
    cache: &'a dyn SeasonalCache,
}

impl<'a> SeasonalDetector<'a> {
    pub fn new(cfg: &'a SeasonalConfig, cache: &'a dyn SeasonalCache) -> Self {
        Self { cfg, cache }
    }

    /// Score the last value of `values` against the model's forecast
    /// interval. Fits or refits the model as needed; returns `ModelFit`
    /// errors for the caller to downgrade to the remaining tiers.
    pub fn score(
        &self,
        tenant: &str,
        kpi: &str,
        values: &[f64],
        season_len: usize,
        run_index: u64,
    ) -> Result<TierScore, EngineError> {
        let n = values.len();
        if n < 2 {
            return Err(EngineError::ModelFit {
                kpi: kpi.to_string(),
                reason: "series too short".to_string(),
            });
        }
        let train = &values[..n - 1];
        let actual = values[n - 1];

        let mut model = match self.cache.get_model(tenant, kpi) {
            Some(m) if m.season_len == season_len && !m.needs_refit(run_index, self.cfg) => m,
            Some(m) => {
                debug!(
                    kpi,
                    age_runs = run_index.saturating_sub(m.fitted_at_run),
                    rolling_ape = m.rolling_ape,
                    "Seasonal model stale or drifted — refitting"
                );
                SeasonalModel::fit(kpi, train, season_len, self.cfg.min_history_seasons, run_index)?
            }
            None => SeasonalModel::fit(
                kpi,
                train,
                season_len,
                self.cfg.min_history_seasons,
                run_index,
            )?,
        };

        let expected = model.forecast(n - 1);
        let interval = (self.cfg.interval_z * model.resid_std).max(1e-9);
        let deviation = actual - expected;
        let ratio = deviation.abs() / interval;

        model.observe_error(actual, expected);
        self.cache.put_model(tenant, kpi, &model);

        // At the CI edge the score is 0.5; twice the interval saturates it
        let score = (ratio / 2.0).clamp(0.0, 1.0);

        Ok(TierScore {
            method: DetectionMethod::SeasonalForecast,
            score,
            direction: if deviation >= 0.0 {
                AnomalyDirection::Up
            } else {
                AnomalyDirection::Down
            },
            detail: format!(
                "expected {expected:.2} ± {interval:.2}, actual {actual:.2}"
            ),
        })
    }
}

//! Anomaly Detector - three-tier ensemble behind a common capability
//!
//! ## Architecture
//!
//! - **Tier 1** (`statistical`): median/MAD modified z-score — fast path
//!   for extreme deviations.
//! - **Tier 2** (`seasonal`): cached seasonal forecast with a confidence
//!   interval, refit only on staleness or drift.
//! - **Tier 3** (`multivariate`): seeded isolation forest over a contextual
//!   feature vector.
//!
//! Each tier implements the [`Detector`] capability and is combined by
//! [`DetectorEnsemble`] with configured weights; tiers that cannot run on a
//! series (insufficient history, model-fit failure) are skipped and the
//! remaining weights renormalized, so new detector types can be added
//! without touching the coordinator. When no tier can run at all, a
//! population-level prior from the static threshold table stands in at
//! reduced confidence.

pub mod multivariate;
pub mod preprocess;
pub mod seasonal;
pub mod statistical;

pub use multivariate::MultivariateDetector;
pub use preprocess::{prepare, PreparedSeries};
pub use seasonal::{MemorySeasonalCache, SeasonalCache, SeasonalDetector, SeasonalModel};
pub use statistical::StatisticalDetector;

use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::error::EngineError;
use crate::stats;
use crate::types::{Anomaly, AnomalyDirection, DetectionMethod, KpiSeries, Severity, TierScore};

// ============================================================================
// Detector capability
// ============================================================================

/// Per-run context shared by the detector tiers.
pub struct DetectContext<'a> {
    pub tenant_id: &'a str,
    /// Monotonic run counter, used for seasonal model staleness.
    pub run_index: u64,
    pub cache: &'a dyn SeasonalCache,
}

/// Common detection capability. Tiers score the *last* point of a prepared
/// series; `Ok(None)` means the tier declines (insufficient history), while
/// `Err(ModelFit)` lets the coordinator fall back to the remaining tiers.
pub trait Detector {
    fn method(&self) -> DetectionMethod;

    fn detect(
        &self,
        series: &PreparedSeries,
        ctx: &DetectContext<'_>,
    ) -> Result<Option<TierScore>, EngineError>;
}

impl Detector for StatisticalDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::RobustZScore
    }

    fn detect(
        &self,
        series: &PreparedSeries,
        _ctx: &DetectContext<'_>,
    ) -> Result<Option<TierScore>, EngineError> {
        Ok(self.score(&series.values))
    }
}

impl Detector for SeasonalDetector<'_> {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::SeasonalForecast
    }

    fn detect(
        &self,
        series: &PreparedSeries,
        ctx: &DetectContext<'_>,
    ) -> Result<Option<TierScore>, EngineError> {
        self.score(
            ctx.tenant_id,
            &series.kpi_name,
            &series.values,
            series.frequency.season_length(),
            ctx.run_index,
        )
        .map(Some)
    }
}

impl Detector for MultivariateDetector<'_> {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::IsolationForest
    }

    fn detect(
        &self,
        series: &PreparedSeries,
        _ctx: &DetectContext<'_>,
    ) -> Result<Option<TierScore>, EngineError> {
        Ok(self.score(&series.values, series.frequency.season_length()))
    }
}

// ============================================================================
// Ensemble coordinator
// ============================================================================

/// Weighted combination of the detector tiers.
pub struct DetectorEnsemble<'a> {
    cfg: &'a DetectionConfig,
}

impl<'a> DetectorEnsemble<'a> {
    pub fn new(cfg: &'a DetectionConfig) -> Self {
        Self { cfg }
    }

    fn weight_for(&self, method: DetectionMethod) -> f64 {
        match method {
            DetectionMethod::RobustZScore => self.cfg.tier_weights.statistical,
            DetectionMethod::SeasonalForecast => self.cfg.tier_weights.seasonal,
            DetectionMethod::IsolationForest => self.cfg.tier_weights.multivariate,
            DetectionMethod::PopulationPrior => 1.0,
        }
    }

    /// Run the full ensemble on one series. Returns `Ok(None)` when the
    /// last point is not anomalous; data-quality failures propagate so the
    /// pipeline can isolate the KPI.
    pub fn detect(
        &self,
        series: &KpiSeries,
        ctx: &DetectContext<'_>,
    ) -> Result<Option<Anomaly>, EngineError> {
        let prepared = prepare(series, self.cfg)?;

        let mut tiers: Vec<TierScore> = Vec::with_capacity(3);

        if prepared.values.len() >= self.cfg.min_history_points {
            let statistical = StatisticalDetector::new(self.cfg.robust_z_threshold);
            let seasonal = SeasonalDetector::new(&self.cfg.seasonal, ctx.cache);
            let multivariate = MultivariateDetector::new(&self.cfg.isolation);
            let detectors: [&dyn Detector; 3] = [&statistical, &seasonal, &multivariate];

            for detector in detectors {
                match detector.detect(&prepared, ctx) {
                    Ok(Some(tier)) => tiers.push(tier),
                    Ok(None) => {
                        debug!(kpi = %prepared.kpi_name, method = %detector.method(), "Tier declined (insufficient history)");
                    }
                    Err(EngineError::ModelFit { kpi, reason }) => {
                        debug!(kpi = %kpi, reason = %reason, "Tier fit failed — falling back to remaining tiers");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        // Population-level prior when nothing else could run
        if tiers.is_empty() {
            match self.population_prior(&prepared) {
                Some(tier) => tiers.push(tier),
                None => {
                    return Err(EngineError::DataQuality {
                        kpi: prepared.kpi_name,
                        reason: format!(
                            "{} points is below the detection minimum and no static threshold is configured",
                            prepared.values.len()
                        ),
                    });
                }
            }
        }

        Ok(self.combine(&prepared, &tiers))
    }

    /// Z-score against the per-KPI static threshold table; confidence is
    /// capped because the baseline is not this tenant's own history.
    fn population_prior(&self, series: &PreparedSeries) -> Option<TierScore> {
        let prior = self.cfg.static_thresholds.get(&series.kpi_name)?;
        let last = *series.values.last()?;
        if prior.std <= 0.0 {
            return None;
        }
        let z = (last - prior.mean) / prior.std;
        let score = (z.abs() / (2.0 * self.cfg.robust_z_threshold)).clamp(0.0, 0.5);
        Some(TierScore {
            method: DetectionMethod::PopulationPrior,
            score,
            direction: if z >= 0.0 {
                AnomalyDirection::Up
            } else {
                AnomalyDirection::Down
            },
            detail: format!("population prior z={z:.2}"),
        })
    }

    /// Weighted combination with renormalization over the tiers present.
    fn combine(&self, series: &PreparedSeries, tiers: &[TierScore]) -> Option<Anomaly> {
        if tiers.is_empty() {
            return None;
        }

        let weight_sum: f64 = tiers.iter().map(|t| self.weight_for(t.method)).sum();
        if weight_sum <= 0.0 {
            warn!(kpi = %series.kpi_name, "Detector weights sum to zero — skipping");
            return None;
        }

        let combined: f64 = tiers
            .iter()
            .map(|t| t.score * self.weight_for(t.method))
            .sum::<f64>()
            / weight_sum;

        if combined < self.cfg.anomaly_threshold {
            return None;
        }

        // Direction by weighted vote
        let up_mass: f64 = tiers
            .iter()
            .filter(|t| t.direction == AnomalyDirection::Up)
            .map(|t| t.score * self.weight_for(t.method))
            .sum();
        let direction = if up_mass * 2.0 >= combined * weight_sum {
            AnomalyDirection::Up
        } else {
            AnomalyDirection::Down
        };

        let severity = self.bucket_severity(combined);
        let confidence = (combined - series.confidence_penalty).clamp(0.0, 1.0);

        let last = *series.values.last()?;
        let n = series.values.len();
        let baseline_window = &series.values[n.saturating_sub(8)..n - 1];
        let baseline = stats::mean(baseline_window);
        let magnitude = if baseline.abs() > 1e-9 {
            (last - baseline) / baseline.abs()
        } else {
            0.0
        };

        let methods: Vec<DetectionMethod> = tiers.iter().map(|t| t.method).collect();
        let details: Vec<&str> = tiers.iter().map(|t| t.detail.as_str()).collect();
        let explanation = format!(
            "{} {} {:.1}% vs trailing week ({})",
            series.kpi_name,
            match direction {
                AnomalyDirection::Up => "up",
                AnomalyDirection::Down => "down",
            },
            magnitude.abs() * 100.0,
            details.join("; ")
        );

        Some(Anomaly {
            kpi_name: series.kpi_name.clone(),
            timestamp: *series.timestamps.last()?,
            magnitude,
            direction,
            severity,
            confidence,
            methods,
            explanation,
        })
    }

    fn bucket_severity(&self, combined: f64) -> Severity {
        let b = &self.cfg.severity;
        if combined >= b.critical {
            Severity::Critical
        } else if combined >= b.high {
            Severity::High
        } else if combined >= b.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticThreshold;
    use crate::types::{KpiPoint, SamplingFrequency};
    use chrono::{TimeZone, Utc};

    fn daily_series(values: &[f64]) -> KpiSeries {
        let mut s = KpiSeries::new("mrr", SamplingFrequency::Daily);
        for (i, &v) in values.iter().enumerate() {
            s.points.push(KpiPoint {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
                value: v,
            });
        }
        s
    }

    /// 90 days of ~2%/month growth with a weekly cycle.
    fn growth_values(days: usize) -> Vec<f64> {
        let weekly = [1.0, 1.01, 1.02, 1.03, 1.02, 0.97, 0.95];
        (0..days)
            .map(|i| 1000.0 * (1.0_f64 + 0.02 / 30.0).powi(i as i32) * weekly[i % 7])
            .collect()
    }

    #[test]
    fn single_day_40pct_drop_is_critical_down() {
        let mut values = growth_values(90);
        let last = values.len() - 1;
        values[last] *= 0.6; // 40% drop on the final day
        let series = daily_series(&values);

        let cfg = DetectionConfig::default();
        let cache = MemorySeasonalCache::default();
        let ctx = DetectContext {
            tenant_id: "t1",
            run_index: 0,
            cache: &cache,
        };
        let anomaly = DetectorEnsemble::new(&cfg)
            .detect(&series, &ctx)
            .unwrap()
            .expect("drop must be flagged");

        assert_eq!(anomaly.severity, Severity::Critical);
        assert_eq!(anomaly.direction, AnomalyDirection::Down);
        assert!(anomaly.confidence > 0.8);
        assert!(anomaly.methods.contains(&DetectionMethod::SeasonalForecast));
        assert!(anomaly.magnitude < -0.3);
    }

    #[test]
    fn stable_growth_not_flagged() {
        let series = daily_series(&growth_values(90));
        let cfg = DetectionConfig::default();
        let cache = MemorySeasonalCache::default();
        let ctx = DetectContext {
            tenant_id: "t1",
            run_index: 0,
            cache: &cache,
        };
        let result = DetectorEnsemble::new(&cfg).detect(&series, &ctx).unwrap();
        assert!(result.is_none(), "clean growth must not alarm: {result:?}");
    }

    #[test]
    fn short_series_without_prior_is_data_quality_error() {
        let series = daily_series(&[10.0, 11.0, 10.5, 10.7]);
        let cfg = DetectionConfig::default();
        let cache = MemorySeasonalCache::default();
        let ctx = DetectContext {
            tenant_id: "t1",
            run_index: 0,
            cache: &cache,
        };
        let err = DetectorEnsemble::new(&cfg).detect(&series, &ctx).unwrap_err();
        assert!(matches!(err, EngineError::DataQuality { .. }));
    }

    #[test]
    fn short_series_with_prior_uses_population_fallback() {
        let series = daily_series(&[10.0, 11.0, 10.5, 95.0]);
        let mut cfg = DetectionConfig::default();
        cfg.anomaly_threshold = 0.3;
        cfg.static_thresholds.insert(
            "mrr".to_string(),
            StaticThreshold { mean: 10.0, std: 5.0 },
        );
        let cache = MemorySeasonalCache::default();
        let ctx = DetectContext {
            tenant_id: "t1",
            run_index: 0,
            cache: &cache,
        };
        let anomaly = DetectorEnsemble::new(&cfg)
            .detect(&series, &ctx)
            .unwrap()
            .expect("prior-based detection");
        assert_eq!(anomaly.methods, vec![DetectionMethod::PopulationPrior]);
        // Borrowed baseline caps confidence
        assert!(anomaly.confidence <= 0.5);
    }

    #[test]
    fn filled_gaps_reduce_confidence() {
        let mut clean = growth_values(90);
        let last = clean.len() - 1;
        clean[last] *= 0.6;
        let mut series = daily_series(&clean);
        // Punch two separate 1-day holes well before the anomaly
        series.points.remove(40);
        series.points.remove(60);

        let cfg = DetectionConfig::default();
        let cache_a = MemorySeasonalCache::default();
        let cache_b = MemorySeasonalCache::default();
        let gap_conf = DetectorEnsemble::new(&cfg)
            .detect(
                &series,
                &DetectContext { tenant_id: "t1", run_index: 0, cache: &cache_a },
            )
            .unwrap()
            .expect("still detected")
            .confidence;
        let clean_conf = DetectorEnsemble::new(&cfg)
            .detect(
                &daily_series(&clean),
                &DetectContext { tenant_id: "t1", run_index: 0, cache: &cache_b },
            )
            .unwrap()
            .expect("detected")
            .confidence;
        assert!(
            gap_conf < clean_conf,
            "gap-filled confidence {gap_conf} should be below clean {clean_conf}"
        );
    }

    #[test]
    fn detection_deterministic_across_runs() {
        let mut values = growth_values(90);
        let last = values.len() - 1;
        values[last] *= 0.6;
        let series = daily_series(&values);
        let cfg = DetectionConfig::default();

        let run = || {
            let cache = MemorySeasonalCache::default();
            let ctx = DetectContext { tenant_id: "t1", run_index: 0, cache: &cache };
            DetectorEnsemble::new(&cfg).detect(&series, &ctx).unwrap().unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.magnitude, b.magnitude);
    }
}

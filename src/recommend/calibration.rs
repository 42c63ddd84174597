//! Adaptive confidence calibration from founder feedback
//!
//! Each (tenant, rule-or-pattern) pair carries a bounded adjustment that
//! shifts the base confidence of future candidates. Updates move by a
//! fixed step per feedback event and clamp at configured bounds — drift is
//! bounded by construction, never unbounded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::types::FeedbackAction;

/// Per-(tenant, origin) calibration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationStat {
    pub origin_id: String,
    /// Accumulated confidence adjustment, clamped to the configured bounds.
    pub adjustment: f64,
    pub accepted: u32,
    pub dismissed: u32,
    pub ignored: u32,
    pub updated_at: DateTime<Utc>,
}

impl CalibrationStat {
    pub fn new(origin_id: impl Into<String>) -> Self {
        Self {
            origin_id: origin_id.into(),
            adjustment: 0.0,
            accepted: 0,
            dismissed: 0,
            ignored: 0,
            updated_at: Utc::now(),
        }
    }

    /// Apply one feedback event with a bounded, clamped step.
    ///
    /// Accepted raises confidence by a full step; dismissed lowers it by a
    /// full step; ignored is weaker negative signal at half a step.
    pub fn apply(&mut self, action: FeedbackAction, cfg: &CalibrationConfig) {
        let delta = match action {
            FeedbackAction::Accepted => {
                self.accepted += 1;
                cfg.step
            }
            FeedbackAction::Dismissed => {
                self.dismissed += 1;
                -cfg.step
            }
            FeedbackAction::Ignored => {
                self.ignored += 1;
                -cfg.step / 2.0
            }
        };
        self.adjustment =
            (self.adjustment + delta).clamp(cfg.min_adjustment, cfg.max_adjustment);
        self.updated_at = Utc::now();
    }

    /// Acceptance rate over rated events (accepted + dismissed).
    pub fn acceptance_rate(&self) -> Option<f64> {
        let rated = self.accepted + self.dismissed;
        if rated == 0 {
            None
        } else {
            Some(f64::from(self.accepted) / f64::from(rated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CalibrationConfig {
        CalibrationConfig::default()
    }

    #[test]
    fn accepted_raises_dismissed_lowers() {
        let cfg = cfg();
        let mut stat = CalibrationStat::new("runway_below_6mo");
        stat.apply(FeedbackAction::Accepted, &cfg);
        assert!((stat.adjustment - cfg.step).abs() < 1e-12);
        stat.apply(FeedbackAction::Dismissed, &cfg);
        stat.apply(FeedbackAction::Dismissed, &cfg);
        assert!((stat.adjustment + cfg.step).abs() < 1e-12);
    }

    #[test]
    fn ignored_is_half_step() {
        let cfg = cfg();
        let mut stat = CalibrationStat::new("x");
        stat.apply(FeedbackAction::Ignored, &cfg);
        assert!((stat.adjustment + cfg.step / 2.0).abs() < 1e-12);
    }

    #[test]
    fn adjustment_clamped_under_sustained_feedback() {
        let cfg = cfg();
        let mut stat = CalibrationStat::new("x");
        for _ in 0..1000 {
            stat.apply(FeedbackAction::Dismissed, &cfg);
        }
        assert!((stat.adjustment - cfg.min_adjustment).abs() < 1e-12);
        for _ in 0..1000 {
            stat.apply(FeedbackAction::Accepted, &cfg);
        }
        assert!((stat.adjustment - cfg.max_adjustment).abs() < 1e-12);
    }

    #[test]
    fn acceptance_rate_ignores_unrated() {
        let cfg = cfg();
        let mut stat = CalibrationStat::new("x");
        assert!(stat.acceptance_rate().is_none());
        stat.apply(FeedbackAction::Accepted, &cfg);
        stat.apply(FeedbackAction::Dismissed, &cfg);
        stat.apply(FeedbackAction::Ignored, &cfg);
        assert!((stat.acceptance_rate().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stat_serde_roundtrip() {
        let mut stat = CalibrationStat::new("x");
        stat.apply(FeedbackAction::Accepted, &CalibrationConfig::default());
        let json = serde_json::to_string(&stat).unwrap();
        let decoded: CalibrationStat = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.accepted, 1);
        assert_eq!(decoded.adjustment, stat.adjustment);
    }
}

//! Tier 1: robust statistical outlier test
//!
//! A median/MAD modified z-score over the trailing history — the fast path
//! for extreme deviations. Robust to the outlier itself contaminating the
//! baseline, unlike a mean/std z-score.

use crate::types::{AnomalyDirection, DetectionMethod, TierScore};
use crate::stats;

/// Median/MAD modified z-score detector.
#[derive(Debug, Clone)]
pub struct StatisticalDetector {
    /// |z| at which the score reaches 0.5 (Iglewicz-Hoaglin: 3.5).
    pub z_threshold: f64,
}

impl StatisticalDetector {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    /// Score the last value against the preceding history.
    ///
    /// Returns `None` when the history is too short for a robust baseline.
    pub fn score(&self, values: &[f64]) -> Option<TierScore> {
        let n = values.len();
        if n < 5 {
            return None;
        }
        let (baseline, last) = (&values[..n - 1], values[n - 1]);
        let z = stats::modified_z_score(last, baseline);

        // Linear ramp: z_threshold -> 0.5, 2*z_threshold -> 1.0
        let score = (z.abs() / (2.0 * self.z_threshold)).clamp(0.0, 1.0);

        Some(TierScore {
            method: DetectionMethod::RobustZScore,
            score,
            direction: if z >= 0.0 {
                AnomalyDirection::Up
            } else {
                AnomalyDirection::Down
            },
            detail: format!("modified z={z:.2}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_spike_scores_high() {
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 + (i % 4) as f64).collect();
        values.push(200.0);
        let detector = StatisticalDetector::new(3.5);
        let tier = detector.score(&values).unwrap();
        assert!(tier.score > 0.9, "score was {}", tier.score);
        assert_eq!(tier.direction, AnomalyDirection::Up);
    }

    #[test]
    fn normal_point_scores_low() {
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 + (i % 4) as f64).collect();
        values.push(101.5);
        let detector = StatisticalDetector::new(3.5);
        let tier = detector.score(&values).unwrap();
        assert!(tier.score < 0.2, "score was {}", tier.score);
    }

    #[test]
    fn drop_direction_is_down() {
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 + (i % 4) as f64).collect();
        values.push(40.0);
        let detector = StatisticalDetector::new(3.5);
        let tier = detector.score(&values).unwrap();
        assert_eq!(tier.direction, AnomalyDirection::Down);
        assert!(tier.score > 0.9);
    }

    #[test]
    fn short_history_skipped() {
        let detector = StatisticalDetector::new(3.5);
        assert!(detector.score(&[1.0, 2.0, 3.0]).is_none());
    }
}

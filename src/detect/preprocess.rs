//! Series preparation: ordering checks and bounded gap repair
//!
//! Missing points inside a series are repaired by linear interpolation up
//! to a configured bound, with a confidence penalty per filled point.
//! Gaps beyond the bound are a data-quality failure for that KPI only —
//! values are never fabricated across long holes.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::DetectionConfig;
use crate::error::EngineError;
use crate::types::{KpiSeries, SamplingFrequency};

/// A gap-repaired series ready for the detector tiers.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub kpi_name: String,
    pub frequency: SamplingFrequency,
    /// Regularized values, oldest first.
    pub values: Vec<f64>,
    /// Timestamps aligned with `values`.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Number of interpolated points.
    pub filled: usize,
    /// Confidence penalty accumulated from filling, already capped.
    pub confidence_penalty: f64,
}

/// Validate and regularize a series for detection.
pub fn prepare(series: &KpiSeries, cfg: &DetectionConfig) -> Result<PreparedSeries, EngineError> {
    if series.points.len() < 2 {
        return Err(EngineError::DataQuality {
            kpi: series.kpi_name.clone(),
            reason: format!("only {} points", series.points.len()),
        });
    }
    if !series.is_ordered() {
        return Err(EngineError::DataQuality {
            kpi: series.kpi_name.clone(),
            reason: "timestamps out of order".to_string(),
        });
    }

    let interval = Duration::days(series.frequency.interval_days());
    let mut values = Vec::with_capacity(series.points.len());
    let mut timestamps = Vec::with_capacity(series.points.len());
    let mut filled = 0usize;

    values.push(series.points[0].value);
    timestamps.push(series.points[0].timestamp);

    for window in series.points.windows(2) {
        let (prev, next) = (&window[0], &window[1]);
        let gap_secs = (next.timestamp - prev.timestamp).num_seconds();
        let interval_secs = interval.num_seconds().max(1);
        // Number of whole missing slots between the two observations
        let missing = ((gap_secs + interval_secs / 2) / interval_secs - 1).max(0) as usize;

        if missing > cfg.max_fill_gap {
            return Err(EngineError::DataQuality {
                kpi: series.kpi_name.clone(),
                reason: format!(
                    "gap of {missing} missing points at {} exceeds fill bound {}",
                    prev.timestamp, cfg.max_fill_gap
                ),
            });
        }

        // Linear interpolation across the hole
        for k in 1..=missing {
            let frac = k as f64 / (missing + 1) as f64;
            values.push(prev.value + (next.value - prev.value) * frac);
            timestamps.push(prev.timestamp + interval * k as i32);
            filled += 1;
        }

        values.push(next.value);
        timestamps.push(next.timestamp);
    }

    if filled > 0 {
        debug!(
            kpi = %series.kpi_name,
            filled,
            "Repaired series gaps by interpolation"
        );
    }

    let confidence_penalty = (filled as f64 * cfg.fill_confidence_penalty).min(0.5);

    Ok(PreparedSeries {
        kpi_name: series.kpi_name.clone(),
        frequency: series.frequency,
        values,
        timestamps,
        filled,
        confidence_penalty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KpiPoint;
    use chrono::TimeZone;

    fn daily_series(values: &[(i64, f64)]) -> KpiSeries {
        let mut s = KpiSeries::new("mrr", SamplingFrequency::Daily);
        for &(day, value) in values {
            s.points.push(KpiPoint {
                timestamp: Utc.timestamp_opt(1_700_000_000 + day * 86_400, 0).unwrap(),
                value,
            });
        }
        s
    }

    #[test]
    fn regular_series_untouched() {
        let s = daily_series(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let p = prepare(&s, &DetectionConfig::default()).unwrap();
        assert_eq!(p.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(p.filled, 0);
        assert_eq!(p.confidence_penalty, 0.0);
    }

    #[test]
    fn small_gap_interpolated() {
        // Day 2 and 3 missing: 10 -> 40 over 3 intervals
        let s = daily_series(&[(0, 10.0), (1, 10.0), (4, 40.0)]);
        let p = prepare(&s, &DetectionConfig::default()).unwrap();
        assert_eq!(p.filled, 2);
        assert_eq!(p.values.len(), 5);
        assert!((p.values[2] - 20.0).abs() < 1e-9);
        assert!((p.values[3] - 30.0).abs() < 1e-9);
        assert!(p.confidence_penalty > 0.0);
    }

    #[test]
    fn oversized_gap_is_data_quality_error() {
        let s = daily_series(&[(0, 10.0), (10, 40.0)]);
        let err = prepare(&s, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::DataQuality { .. }));
    }

    #[test]
    fn unordered_series_rejected() {
        let mut s = daily_series(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        s.points.swap(0, 2);
        let err = prepare(&s, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::DataQuality { .. }));
    }

    #[test]
    fn penalty_capped() {
        let mut cfg = DetectionConfig::default();
        cfg.fill_confidence_penalty = 0.4;
        let s = daily_series(&[(0, 1.0), (3, 4.0), (6, 7.0)]);
        let p = prepare(&s, &cfg).unwrap();
        assert_eq!(p.filled, 4);
        assert!(p.confidence_penalty <= 0.5);
    }
}

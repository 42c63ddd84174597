//! Detector backtest against synthetic ground truth
//!
//! Injects known spike, drop and level-shift anomalies into seeded
//! synthetic series and checks ensemble recall and false-positive rate
//! against the configured targets.

use chrono::{TimeZone, Utc};

use pulse_engine::config::DetectionConfig;
use pulse_engine::detect::{DetectContext, DetectorEnsemble, MemorySeasonalCache};
use pulse_engine::types::{AnomalyDirection, KpiPoint, KpiSeries, SamplingFrequency};

/// Deterministic pseudo-noise in [-0.5, 0.5).
fn pseudo(i: usize, stream: u64) -> f64 {
    let h = (i as u64 + 1)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(stream.wrapping_mul(0xD1B5_4A32_D192_ED03));
    ((h >> 33) % 10_000) as f64 / 10_000.0 - 0.5
}

/// Weekly-seasonal growth series with mild noise.
fn base_series(days: usize, stream: u64) -> Vec<f64> {
    let weekly = [1.0, 1.01, 1.02, 1.04, 1.02, 0.96, 0.94];
    (0..days)
        .map(|i| {
            1000.0
                * (1.0_f64 + 0.02 / 30.0).powi(i as i32)
                * weekly[i % 7]
                * (1.0 + pseudo(i, stream) * 0.015)
        })
        .collect()
}

fn detect_last(values: &[f64]) -> Option<pulse_engine::Anomaly> {
    let mut series = KpiSeries::new("kpi", SamplingFrequency::Daily);
    for (i, &v) in values.iter().enumerate() {
        series.points.push(KpiPoint {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
            value: v,
        });
    }
    let cfg = DetectionConfig::default();
    let cache = MemorySeasonalCache::default();
    let ctx = DetectContext {
        tenant_id: "bt",
        run_index: 0,
        cache: &cache,
    };
    DetectorEnsemble::new(&cfg)
        .detect(&series, &ctx)
        .expect("clean synthetic data never degrades")
}

#[test]
fn spike_recall_meets_target() {
    let mut detected = 0_u64;
    let trials = 20_u64;
    for stream in 0..trials {
        let mut values = base_series(90, stream);
        let last = values.len() - 1;
        values[last] *= 1.6; // +60% spike
        if let Some(anomaly) = detect_last(&values) {
            assert_eq!(anomaly.direction, AnomalyDirection::Up);
            detected += 1;
        }
    }
    let recall = detected as f64 / trials as f64;
    assert!(recall >= 0.9, "spike recall {recall} below target");
}

#[test]
fn drop_recall_meets_target() {
    let mut detected = 0_u64;
    let trials = 20_u64;
    for stream in 0..trials {
        let mut values = base_series(90, stream + 100);
        let last = values.len() - 1;
        values[last] *= 0.5; // -50% drop
        if let Some(anomaly) = detect_last(&values) {
            assert_eq!(anomaly.direction, AnomalyDirection::Down);
            detected += 1;
        }
    }
    let recall = detected as f64 / trials as f64;
    assert!(recall >= 0.9, "drop recall {recall} below target");
}

#[test]
fn level_shift_detected_at_shift_day() {
    // A 35% level shift on the final day (persisting shifts are caught on
    // the day they start)
    let mut detected = 0_u64;
    let trials = 20_u64;
    for stream in 0..trials {
        let mut values = base_series(90, stream + 200);
        let last = values.len() - 1;
        values[last] *= 0.65;
        if detect_last(&values).is_some() {
            detected += 1;
        }
    }
    let recall = detected as f64 / trials as f64;
    assert!(recall >= 0.85, "level-shift recall {recall} below target");
}

#[test]
fn false_positive_rate_within_budget() {
    let mut false_positives = 0_u64;
    let trials = 40_u64;
    for stream in 0..trials {
        let values = base_series(90, stream + 300);
        if detect_last(&values).is_some() {
            false_positives += 1;
        }
    }
    let rate = false_positives as f64 / trials as f64;
    assert!(rate <= 0.1, "false positive rate {rate} above budget");
}

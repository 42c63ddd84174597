//! Trend Analyzer - multi-timescale trend computation
//!
//! Each timeframe compares the current window against the prior window with
//! Welch's t-test and a standardized effect size. Direction is only Up/Down
//! when both the minimum-change threshold and significance hold; a noisy
//! window is Volatile; anything else is Flat. Medium-term adds an OLS slope
//! with fit quality; long horizons report period-over-period growth and a
//! compounding rate. Acceleration is the sign of the second difference of a
//! smoothed series. Near-zero baselines yield an explicit indeterminate
//! result instead of an unbounded ratio.
//!
//! Analysis is a pure function of the input series — identical history
//! gives identical classification on repeated runs.

use tracing::debug;

use crate::config::TrendConfig;
use crate::stats;
use crate::types::{
    Acceleration, EffectSize, KpiSeries, Timeframe, Trend, TrendDirection,
};

/// Multi-timescale trend analyzer.
pub struct TrendAnalyzer<'a> {
    cfg: &'a TrendConfig,
}

impl<'a> TrendAnalyzer<'a> {
    pub fn new(cfg: &'a TrendConfig) -> Self {
        Self { cfg }
    }

    /// Analyze one series over one timeframe. Total: short or degenerate
    /// histories come back indeterminate rather than failing.
    pub fn analyze(&self, series: &KpiSeries, timeframe: Timeframe) -> Trend {
        let values = series.values();
        let w = timeframe.window_points(series.frequency);

        // Current window plus at least a few prior points to compare against
        if values.len() < w + 3 {
            debug!(kpi = %series.kpi_name, %timeframe, points = values.len(), "Too little history for trend");
            return Trend::indeterminate(&series.kpi_name, timeframe);
        }

        let current = &values[values.len() - w..];
        let prior: &[f64] = if values.len() >= 2 * w {
            &values[values.len() - 2 * w..values.len() - w]
        } else {
            &values[..values.len() - w]
        };

        let prior_mean = stats::mean(prior);
        if prior_mean.abs() < self.cfg.zero_baseline_epsilon {
            return Trend::indeterminate(&series.kpi_name, timeframe);
        }

        let current_mean = stats::mean(current);
        let magnitude = (current_mean - prior_mean) / prior_mean.abs();

        let test = stats::welch_t_test(current, prior);
        let significant = test.p_value < self.cfg.significance_alpha;
        let effect_size = EffectSize::from_cohens_d(test.cohens_d);

        // Volatility gate: noisy current window has no stable direction
        let cv = stats::std_dev(current) / current_mean.abs().max(self.cfg.zero_baseline_epsilon);
        let direction = if cv > self.cfg.volatility_cv {
            TrendDirection::Volatile
        } else if magnitude.abs() >= self.cfg.min_change_pct && significant {
            if magnitude > 0.0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            }
        } else {
            TrendDirection::Flat
        };

        // Medium-term linear fit over the current window
        let (slope, r_squared) = if timeframe == Timeframe::MoM {
            let fit = stats::ols_fit(current);
            (Some(fit.slope), Some(fit.r_squared))
        } else {
            (None, None)
        };

        // Long-horizon compounding: per-month geometric rate of the
        // window-over-window growth
        let compound_rate = if timeframe.is_long_horizon() {
            let growth = current_mean / prior_mean;
            if growth > 0.0 {
                let months = (timeframe.window_days() as f64 / 30.0).max(1.0);
                Some(growth.powf(1.0 / months) - 1.0)
            } else {
                None
            }
        } else {
            None
        };

        Trend {
            kpi_name: series.kpi_name.clone(),
            timeframe,
            direction,
            magnitude,
            significant,
            p_value: test.p_value,
            effect_size,
            acceleration: self.acceleration(&values),
            slope,
            r_squared,
            compound_rate,
            indeterminate: false,
        }
    }

    /// Bucketed sign of the second difference of the smoothed series.
    fn acceleration(&self, values: &[f64]) -> Acceleration {
        if values.len() < self.cfg.smoothing_window + 3 {
            return Acceleration::Steady;
        }
        let smoothed = stats::moving_average(values, self.cfg.smoothing_window);
        let n = smoothed.len();

        // Average the trailing second differences for stability
        let take = 5.min(n - 2);
        let mut sum = 0.0;
        for i in n - take..n {
            sum += smoothed[i] - 2.0 * smoothed[i - 1] + smoothed[i - 2];
        }
        let accel = sum / take as f64;

        // Scale by the typical step size so the dead zone is meaningful for
        // both fast-moving and slow-moving series
        let steps: Vec<f64> = smoothed[n - take - 1..]
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .collect();
        let scale = stats::mean(&steps).max(stats::mean(&smoothed[n - take..]).abs() * 1e-3).max(1e-9);
        let relative = accel / scale;

        if relative > self.cfg.accel_dead_zone {
            Acceleration::Accelerating
        } else if relative < -self.cfg.accel_dead_zone {
            Acceleration::Decelerating
        } else {
            Acceleration::Steady
        }
    }
}

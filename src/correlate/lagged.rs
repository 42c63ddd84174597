//! Lagged cross-correlation search and the causality gate
//!
//! For a candidate pair (source, target): find the lag in the configured
//! window that maximizes |Pearson r| between the source shifted back by
//! `lag` and the target. An edge candidate only survives if a
//! Granger-style F-test also passes: regressing the target on its own
//! previous value must be significantly improved by adding the lagged
//! source.
//!
//! Cross-correlation at lag k: r(source[0..n-k], target[k..n]) — "does the
//! source k periods ago help predict the target now?"

use crate::stats;

/// Outcome of the pairwise scan for one ordered (source, target) pair.
#[derive(Debug, Clone, Copy)]
pub struct LagScan {
    /// Lag (in sampling periods) maximizing |Pearson r|, always >= 1.
    pub lag: u32,
    pub pearson_r: f64,
    pub spearman_rho: f64,
    /// P-value of the Granger-style F-test at that lag.
    pub causality_p: f64,
}

/// Find the best lag in `1..=max_lag` and run the causality test there.
///
/// Returns `None` when the overlap is too short to test anything. Lags are
/// capped at a third of the series so both windows keep enough samples.
pub fn scan_pair(source: &[f64], target: &[f64], max_lag: u32, min_overlap: usize) -> Option<LagScan> {
    let n = source.len().min(target.len());
    if n < min_overlap {
        return None;
    }
    let source = &source[source.len() - n..];
    let target = &target[target.len() - n..];

    let effective_max = (max_lag as usize).min(n / 3).max(1);

    let mut best_lag = 0usize;
    let mut best_r = 0.0f64;
    for lag in 1..=effective_max {
        let cause = &source[..n - lag];
        let effect = &target[lag..];
        let r = stats::pearson_r(cause, effect);
        if r.abs() > best_r.abs() {
            best_r = r;
            best_lag = lag;
        }
    }
    if best_lag == 0 {
        return None;
    }

    let cause = &source[..n - best_lag];
    let effect = &target[best_lag..];
    let spearman = stats::spearman_rho(cause, effect);
    let causality_p = granger_p(source, target, best_lag);

    Some(LagScan {
        lag: best_lag as u32,
        pearson_r: best_r,
        spearman_rho: spearman,
        causality_p,
    })
}

/// Granger-style causality p-value at a fixed lag.
///
/// Restricted model:   y_t = a + b*y_{t-1}
/// Unrestricted model: y_t = a + b*y_{t-1} + c*x_{t-lag}
///
/// The F-test asks whether the lagged source significantly reduces the
/// residual variance. Singular fits come back as 1.0 (no evidence).
pub fn granger_p(source: &[f64], target: &[f64], lag: usize) -> f64 {
    let n = source.len().min(target.len());
    let start = lag.max(1);
    if n <= start + 4 {
        return 1.0;
    }

    let y: Vec<f64> = (start..n).map(|t| target[t]).collect();
    let y_prev: Vec<f64> = (start..n).map(|t| target[t - 1]).collect();
    let x_lagged: Vec<f64> = (start..n).map(|t| source[t - lag]).collect();

    let rss_restricted = match stats::ols_rss_multi(&y, &[&y_prev]) {
        Some(rss) => rss,
        None => return 1.0,
    };
    let rss_unrestricted = match stats::ols_rss_multi(&y, &[&y_prev, &x_lagged]) {
        Some(rss) => rss,
        None => return 1.0,
    };

    // df: samples minus 3 fitted parameters of the unrestricted model
    let df = y.len().saturating_sub(3);
    stats::f_test_p(rss_restricted, rss_unrestricted, 1, df)
}

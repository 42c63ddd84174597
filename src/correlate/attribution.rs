//! Multivariate joint-anomaly attribution
//!
//! A separate pass over the cross-KPI vector: each time index becomes a
//! row of per-KPI z-scores, an isolation forest is trained on the history,
//! and the current row's joint score decides whether the tenant is in a
//! jointly anomalous state even when no single KPI alarms. Attribution is
//! leave-one-out perturbation: replace one KPI's coordinate with its
//! historical mean, rescore, and credit the KPI with the score drop.

use crate::config::{CorrelationConfig, IsolationConfig};
use crate::detect::multivariate::IsolationForest;
use crate::stats;
use crate::types::{Attribution, JointAnomaly, TenantSnapshot};

/// Minimum aligned history rows for the joint pass.
const MIN_ROWS: usize = 20;

/// Run the joint-anomaly pass. `None` when the snapshot has too few KPIs
/// or too little aligned history, or when the joint score stays under the
/// configured threshold.
pub fn joint_anomaly(
    snapshot: &TenantSnapshot,
    cfg: &CorrelationConfig,
    iso_cfg: &IsolationConfig,
) -> Option<JointAnomaly> {
    if snapshot.series.len() < 2 {
        return None;
    }

    // Align all series from the tail; z-score each KPI against itself so
    // scales are comparable
    let n = snapshot.series.iter().map(|s| s.len()).min()?;
    if n < MIN_ROWS {
        return None;
    }
    let columns: Vec<Vec<f64>> = snapshot
        .series
        .iter()
        .map(|s| {
            let v = s.values();
            let tail = v[v.len() - n..].to_vec();
            let (m, sd) = (stats::mean(&tail), stats::std_dev(&tail).max(1e-9));
            tail.iter().map(|x| (x - m) / sd).collect()
        })
        .collect();

    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();

    let train = &rows[..n - 1];
    let current = &rows[n - 1];

    let forest = IsolationForest::fit(train, iso_cfg)?;
    let raw = forest.score(current);
    let score = ((raw - 0.5) / 0.3).clamp(0.0, 1.0);
    if score < cfg.joint_anomaly_threshold {
        return None;
    }

    // Leave-one-out: how much does neutralizing each KPI de-isolate the row?
    let mut drops: Vec<(usize, f64)> = Vec::with_capacity(columns.len());
    for k in 0..columns.len() {
        let mut perturbed = current.clone();
        perturbed[k] = stats::mean(&columns[k][..n - 1]);
        let drop = (raw - forest.score(&perturbed)).max(0.0);
        drops.push((k, drop));
    }

    let total: f64 = drops.iter().map(|(_, d)| d).sum();
    let mut contributors: Vec<Attribution> = drops
        .into_iter()
        .map(|(k, d)| Attribution {
            kpi_name: snapshot.series[k].kpi_name.clone(),
            contribution: if total > 1e-12 { d / total } else { 0.0 },
        })
        .collect();
    contributors.sort_by(|a, b| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.kpi_name.cmp(&b.kpi_name))
    });

    let timestamp = snapshot.series.first()?.last()?.timestamp;
    Some(JointAnomaly {
        timestamp,
        score,
        contributors,
    })
}

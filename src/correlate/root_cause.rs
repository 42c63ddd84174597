//! Root-cause tracing over the dependency graph
//!
//! Given an anomaly on KPI X, walk the incoming edges of X and check
//! whether each predecessor KPI itself deviated around the edge's lag. A
//! predecessor's retrospective anomaly score is a modified z-score of its
//! value at the lagged position against its own prior history, so tracing
//! does not depend on the predecessor having been flagged in this run.
//! Candidates are ranked by confidence = |correlation| x predecessor
//! anomaly score and the top one or two are named in the explanation.

use tracing::debug;

use crate::config::CorrelationConfig;
use crate::stats;
use crate::types::{Anomaly, KpiGraph, RootCause, TenantSnapshot};

/// Maximum causes reported per anomaly.
const MAX_CAUSES: usize = 2;

/// Trace candidate root causes for every anomaly in the run.
pub fn trace(
    graph: &KpiGraph,
    anomalies: &[Anomaly],
    snapshot: &TenantSnapshot,
    cfg: &CorrelationConfig,
) -> Vec<RootCause> {
    let mut causes = Vec::new();
    for anomaly in anomalies {
        causes.extend(trace_one(graph, anomaly, snapshot, cfg));
    }
    causes
}

/// Candidate causes for a single anomaly, strongest first.
pub fn trace_one(
    graph: &KpiGraph,
    anomaly: &Anomaly,
    snapshot: &TenantSnapshot,
    cfg: &CorrelationConfig,
) -> Vec<RootCause> {
    let Some(node) = graph.node_id(&anomaly.kpi_name) else {
        return Vec::new();
    };

    let mut candidates: Vec<RootCause> = Vec::new();

    for edge in graph.incoming_edges(node) {
        let Some(pred_series) = snapshot.get(&edge.source_kpi) else {
            continue;
        };
        let values = pred_series.values();
        let n = values.len();

        // The predecessor's implicated window ends `lag` periods before the
        // anomalous point; scan the tolerance band around it.
        let lag = edge.lag as usize;
        let tol = cfg.root_cause_lag_tolerance as usize;
        let mut best_score = 0.0_f64;
        for offset in lag.saturating_sub(tol)..=lag + tol {
            if offset + 3 >= n {
                continue;
            }
            let idx = n - 1 - offset;
            let baseline = &values[..idx];
            if baseline.len() < 5 {
                continue;
            }
            let z = stats::modified_z_score(values[idx], baseline);
            let score = (z.abs() / 7.0).clamp(0.0, 1.0);
            best_score = best_score.max(score);
        }

        if best_score <= 0.1 {
            continue;
        }

        let confidence = (edge.strength * best_score).clamp(0.0, 1.0);
        candidates.push(RootCause {
            anomaly_kpi: anomaly.kpi_name.clone(),
            cause_kpi: edge.source_kpi.clone(),
            lag: edge.lag,
            correlation: edge.pearson_r,
            confidence,
            explanation: String::new(),
        });
    }

    // Rank by confidence; ties broken by |correlation| then name for
    // deterministic output
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.correlation
                    .abs()
                    .partial_cmp(&a.correlation.abs())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.cause_kpi.cmp(&b.cause_kpi))
    });
    candidates.truncate(MAX_CAUSES);

    for (rank, cause) in candidates.iter_mut().enumerate() {
        cause.explanation = format!(
            "{} moved ~{} period(s) before the {} anomaly (r={:+.2}, candidate #{})",
            cause.cause_kpi,
            cause.lag,
            cause.anomaly_kpi,
            cause.correlation,
            rank + 1
        );
    }

    if candidates.is_empty() {
        debug!(kpi = %anomaly.kpi_name, "No upstream candidate explains the anomaly");
    }
    candidates
}

//! Correlation Engine - KPI dependency graph and its consumers
//!
//! ## Architecture
//!
//! - **`lagged`**: pairwise lag search + Granger-style causality gate
//! - **`graph`**: PageRank and betweenness centrality over the arena graph
//! - **`root_cause`**: upstream tracing of anomalies along incoming edges
//! - **`patterns`**: named multi-KPI directional pattern matching
//! - **`attribution`**: joint-anomaly pass with leave-one-out attribution
//!
//! The pairwise sweep is O(k² · lag) and embarrassingly parallel, so it
//! fans out across rayon. Everything downstream reads the immutable graph.

pub mod attribution;
pub mod graph;
pub mod lagged;
pub mod patterns;
pub mod root_cause;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{CorrelationConfig, IsolationConfig, PatternDef};
use crate::types::{
    Anomaly, CorrelationEdge, JointAnomaly, KpiGraph, PatternMatch, RootCause, TenantSnapshot,
    Trend,
};

/// Everything the correlation stage hands downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub graph: KpiGraph,
    pub root_causes: Vec<RootCause>,
    pub pattern_matches: Vec<PatternMatch>,
    pub joint_anomaly: Option<JointAnomaly>,
}

/// Builds the dependency graph and runs the downstream passes.
pub struct CorrelationEngine<'a> {
    cfg: &'a CorrelationConfig,
    iso_cfg: &'a IsolationConfig,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(cfg: &'a CorrelationConfig, iso_cfg: &'a IsolationConfig) -> Self {
        Self { cfg, iso_cfg }
    }

    /// Full correlation stage for one tenant run.
    pub fn analyze(
        &self,
        snapshot: &TenantSnapshot,
        anomalies: &[Anomaly],
        trends: &[Trend],
        patterns: &[PatternDef],
    ) -> CorrelationReport {
        let graph = self.build_graph(snapshot);
        info!(
            tenant = %snapshot.tenant_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Dependency graph built"
        );

        let root_causes = root_cause::trace(&graph, anomalies, snapshot, self.cfg);
        let pattern_matches =
            patterns::evaluate(patterns, trends, self.cfg.pattern_match_fraction);
        let joint_anomaly = attribution::joint_anomaly(snapshot, self.cfg, self.iso_cfg);

        CorrelationReport {
            graph,
            root_causes,
            pattern_matches,
            joint_anomaly,
        }
    }

    /// Pairwise sweep over every ordered KPI pair, in parallel. An edge is
    /// added only when both the correlation and the causality test pass.
    pub fn build_graph(&self, snapshot: &TenantSnapshot) -> KpiGraph {
        let names: Vec<&str> = snapshot.kpi_names();
        let mut graph = KpiGraph::with_nodes(&names);

        let values: Vec<Vec<f64>> = snapshot.series.iter().map(|s| s.values()).collect();
        let k = values.len();

        let pairs: Vec<(usize, usize)> = (0..k)
            .flat_map(|i| (0..k).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();

        let mut edges: Vec<CorrelationEdge> = pairs
            .par_iter()
            .filter_map(|&(source, target)| {
                let scan = lagged::scan_pair(
                    &values[source],
                    &values[target],
                    self.cfg.max_lag,
                    self.cfg.min_overlap,
                )?;
                if scan.pearson_r.abs() < self.cfg.min_abs_r {
                    return None;
                }
                if scan.causality_p >= self.cfg.causality_alpha {
                    debug!(
                        source = names[source],
                        target = names[target],
                        r = scan.pearson_r,
                        p = scan.causality_p,
                        "Correlated but not causal — edge rejected"
                    );
                    return None;
                }
                Some(CorrelationEdge {
                    source,
                    target,
                    source_kpi: names[source].to_string(),
                    target_kpi: names[target].to_string(),
                    lag: scan.lag,
                    pearson_r: scan.pearson_r,
                    spearman_rho: scan.spearman_rho,
                    strength: scan.pearson_r.abs(),
                    causality_p: scan.causality_p,
                })
            })
            .collect();

        // Deterministic edge order regardless of rayon scheduling
        edges.sort_by(|a, b| (a.source, a.target).cmp(&(b.source, b.target)));
        for edge in edges {
            graph.add_edge(edge);
        }

        graph::annotate_centrality(&mut graph, self.cfg);
        graph
    }

    /// Strongest leading indicators: edges sorted by strength descending.
    pub fn leading_indicators<'g>(
        graph: &'g KpiGraph,
        limit: usize,
    ) -> Vec<&'g CorrelationEdge> {
        let mut edges: Vec<&CorrelationEdge> = graph.edges.iter().collect();
        edges.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.source_kpi.cmp(&b.source_kpi))
        });
        edges.truncate(limit);
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KpiPoint, KpiSeries, SamplingFrequency};
    use chrono::{TimeZone, Utc};

    fn series(name: &str, values: &[f64]) -> KpiSeries {
        let mut s = KpiSeries::new(name, SamplingFrequency::Daily);
        for (i, &v) in values.iter().enumerate() {
            s.points.push(KpiPoint {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
                value: v,
            });
        }
        s
    }

    /// Deterministic white-ish signal.
    fn pseudo(i: usize) -> f64 {
        let h = (i as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ((h >> 33) % 1000) as f64 / 1000.0
    }

    fn engine_cfgs() -> (CorrelationConfig, IsolationConfig) {
        (CorrelationConfig::default(), IsolationConfig::default())
    }

    #[test]
    fn shifted_series_produces_lag5_edge() {
        let n = 120;
        let driver: Vec<f64> = (0..n + 5).map(|i| 100.0 + 30.0 * pseudo(i)).collect();
        let a: Vec<f64> = driver[5..].to_vec();
        let b: Vec<f64> = (0..n)
            .map(|i| driver[i] + (pseudo(i + 7_000) - 0.5) * 2.0)
            .collect();

        let mut snap = TenantSnapshot::new("t1");
        snap.series.push(series("a", &a));
        snap.series.push(series("b", &b));

        let (cfg, iso) = engine_cfgs();
        let graph = CorrelationEngine::new(&cfg, &iso).build_graph(&snap);

        let edge = graph
            .edges
            .iter()
            .find(|e| e.source_kpi == "a" && e.target_kpi == "b")
            .expect("a -> b edge");
        assert_eq!(edge.lag, 5);
        assert!(edge.pearson_r.abs() > 0.6, "r was {}", edge.pearson_r);
        assert!(edge.causality_p < 0.05);
    }

    #[test]
    fn edges_respect_lag_bounds_and_no_self_loops() {
        let n = 100;
        let mut snap = TenantSnapshot::new("t1");
        for name in ["a", "b", "c"] {
            let offset = name.as_bytes()[0] as usize;
            let v: Vec<f64> = (0..n).map(|i| 50.0 + 20.0 * pseudo(i + offset)).collect();
            snap.series.push(series(name, &v));
        }
        let (cfg, iso) = engine_cfgs();
        let graph = CorrelationEngine::new(&cfg, &iso).build_graph(&snap);

        for edge in &graph.edges {
            assert_ne!(edge.source, edge.target, "self-loop");
            assert!(edge.lag >= 1);
            assert!(edge.lag <= cfg.max_lag);
            assert!(edge.causality_p < cfg.causality_alpha);
        }
    }

    #[test]
    fn graph_build_deterministic() {
        let n = 110;
        let driver: Vec<f64> = (0..n + 3).map(|i| 10.0 + 5.0 * pseudo(i)).collect();
        let mut snap = TenantSnapshot::new("t1");
        snap.series.push(series("x", &driver[3..].to_vec()));
        snap.series.push(series("y", &driver[..n].to_vec()));

        let (cfg, iso) = engine_cfgs();
        let engine = CorrelationEngine::new(&cfg, &iso);
        let g1 = engine.build_graph(&snap);
        let g2 = engine.build_graph(&snap);
        assert_eq!(g1.edges.len(), g2.edges.len());
        for (e1, e2) in g1.edges.iter().zip(&g2.edges) {
            assert_eq!(e1.lag, e2.lag);
            assert_eq!(e1.pearson_r, e2.pearson_r);
        }
    }

    #[test]
    fn leading_indicators_sorted_by_strength() {
        let mut graph = KpiGraph::with_nodes(&["a", "b", "c"]);
        for (s, t, r) in [(0usize, 1usize, 0.6), (1, 2, 0.9)] {
            graph.add_edge(CorrelationEdge {
                source: s,
                target: t,
                source_kpi: graph.nodes[s].kpi_name.clone(),
                target_kpi: graph.nodes[t].kpi_name.clone(),
                lag: 1,
                pearson_r: r,
                spearman_rho: r,
                strength: r,
                causality_p: 0.01,
            });
        }
        let top = CorrelationEngine::leading_indicators(&graph, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].strength, 0.9);
    }
}

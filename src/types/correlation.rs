//! Correlation graph types: arena-indexed nodes and edges, root causes,
//! pattern matches, multivariate attributions
//!
//! The dependency graph is explicit node/edge collections addressed by
//! index — no pointer-linked nodes — so it serializes per run and supports
//! concurrent reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Graph arena
// ============================================================================

/// A KPI node in the dependency graph, addressed by its index in
/// [`KpiGraph::nodes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiNode {
    pub id: usize,
    pub kpi_name: String,
    /// PageRank centrality (dominant KPIs).
    pub pagerank: f64,
    /// Betweenness centrality (bridging KPIs).
    pub betweenness: f64,
}

/// A directed, lagged edge: the source KPI leads the target KPI by `lag`
/// sampling periods. Added only when both the correlation and the
/// lagged-causality significance test passed the configured thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEdge {
    pub source: usize,
    pub target: usize,
    pub source_kpi: String,
    pub target_kpi: String,
    /// Lag in sampling periods, always >= 0 and within the configured bound.
    pub lag: u32,
    /// Pearson r at the best lag.
    pub pearson_r: f64,
    /// Spearman rank correlation at the best lag.
    pub spearman_rho: f64,
    /// |pearson_r| — edge strength used by tracing and ranking.
    pub strength: f64,
    /// P-value of the lagged-causality F-test.
    pub causality_p: f64,
}

/// The per-run KPI dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KpiGraph {
    pub nodes: Vec<KpiNode>,
    pub edges: Vec<CorrelationEdge>,
    /// Edge indices with this node as source, per node.
    pub outgoing: Vec<Vec<usize>>,
    /// Edge indices with this node as target, per node.
    pub incoming: Vec<Vec<usize>>,
}

impl KpiGraph {
    /// Build an empty graph over the given KPI names.
    pub fn with_nodes(kpi_names: &[&str]) -> Self {
        let nodes = kpi_names
            .iter()
            .enumerate()
            .map(|(id, name)| KpiNode {
                id,
                kpi_name: (*name).to_string(),
                pagerank: 0.0,
                betweenness: 0.0,
            })
            .collect::<Vec<_>>();
        let n = nodes.len();
        Self {
            nodes,
            edges: Vec::new(),
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
        }
    }

    /// Add an edge, maintaining adjacency. Self-loops are rejected.
    pub fn add_edge(&mut self, edge: CorrelationEdge) -> bool {
        if edge.source == edge.target {
            return false;
        }
        if edge.source >= self.nodes.len() || edge.target >= self.nodes.len() {
            return false;
        }
        let idx = self.edges.len();
        self.outgoing[edge.source].push(idx);
        self.incoming[edge.target].push(idx);
        self.edges.push(edge);
        true
    }

    pub fn node_id(&self, kpi_name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.kpi_name == kpi_name)
    }

    /// Edges pointing into the given node.
    pub fn incoming_edges(&self, node: usize) -> impl Iterator<Item = &CorrelationEdge> {
        self.incoming
            .get(node)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }
}

// ============================================================================
// Root cause / pattern / attribution outputs
// ============================================================================

/// A candidate root cause for an anomaly: a correlated, temporally
/// preceding KPI anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCause {
    /// KPI whose anomaly is being explained.
    pub anomaly_kpi: String,
    /// Upstream KPI offered as the candidate cause.
    pub cause_kpi: String,
    /// Edge lag in sampling periods.
    pub lag: u32,
    /// Edge correlation at that lag.
    pub correlation: f64,
    /// |correlation| x predecessor anomaly score, in [0, 1].
    pub confidence: f64,
    /// Explanation naming the cause and the timing relationship.
    pub explanation: String,
}

/// Result of evaluating one named multi-KPI directional pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_name: String,
    /// Fraction of pattern conditions satisfied, in [0, 1].
    pub fraction: f64,
    pub matched: bool,
    pub conditions_total: usize,
    pub conditions_met: usize,
}

/// Per-KPI contribution to a joint multivariate anomaly, from
/// leave-one-out perturbation scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub kpi_name: String,
    /// Normalized contribution in [0, 1]; contributions sum to ~1.
    pub contribution: f64,
}

/// A joint anomaly across the KPI vector with its attributed contributors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointAnomaly {
    pub timestamp: DateTime<Utc>,
    /// Joint anomaly score in [0, 1].
    pub score: f64,
    /// Contributors sorted by contribution descending.
    pub contributors: Vec<Attribution>,
}

//! Graph centrality: PageRank and betweenness over the KPI dependency graph
//!
//! PageRank (damped power iteration, edge strengths as weights) surfaces
//! dominant KPIs — the ones many leading indicators feed into. Betweenness
//! (Brandes' algorithm over the unweighted digraph) surfaces bridging KPIs
//! that sit on the paths between otherwise-separate clusters.

use crate::config::CorrelationConfig;
use crate::types::KpiGraph;

/// Compute and store both centrality measures on the graph's nodes.
pub fn annotate_centrality(graph: &mut KpiGraph, cfg: &CorrelationConfig) {
    let pagerank = pagerank(graph, cfg);
    let betweenness = betweenness(graph);
    for (node, (pr, bc)) in graph
        .nodes
        .iter_mut()
        .zip(pagerank.into_iter().zip(betweenness))
    {
        node.pagerank = pr;
        node.betweenness = bc;
    }
}

/// Damped power iteration with edge strength as transition weight.
/// Dangling mass is redistributed uniformly.
pub fn pagerank(graph: &KpiGraph, cfg: &CorrelationConfig) -> Vec<f64> {
    let n = graph.nodes.len();
    if n == 0 {
        return Vec::new();
    }
    let d = cfg.pagerank_damping;
    let base = (1.0 - d) / n as f64;
    let mut ranks = vec![1.0 / n as f64; n];

    // Outgoing strength sums for normalization
    let out_strength: Vec<f64> = (0..n)
        .map(|v| {
            graph.outgoing[v]
                .iter()
                .map(|&e| graph.edges[e].strength)
                .sum::<f64>()
        })
        .collect();

    for _ in 0..cfg.pagerank_max_iter {
        let mut next = vec![base; n];

        let dangling: f64 = (0..n)
            .filter(|&v| out_strength[v] <= 0.0)
            .map(|v| ranks[v])
            .sum();
        let dangling_share = d * dangling / n as f64;
        for r in &mut next {
            *r += dangling_share;
        }

        for (v, strength_sum) in out_strength.iter().enumerate() {
            if *strength_sum <= 0.0 {
                continue;
            }
            for &e in &graph.outgoing[v] {
                let edge = &graph.edges[e];
                next[edge.target] += d * ranks[v] * (edge.strength / strength_sum);
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .sum();
        ranks = next;
        if delta < cfg.pagerank_epsilon {
            break;
        }
    }
    ranks
}

/// Brandes' betweenness centrality over the unweighted directed graph,
/// normalized to [0, 1] by the number of ordered node pairs.
pub fn betweenness(graph: &KpiGraph) -> Vec<f64> {
    let n = graph.nodes.len();
    let mut centrality = vec![0.0_f64; n];
    if n < 3 {
        return centrality;
    }

    for source in 0..n {
        // BFS from source
        let mut stack: Vec<usize> = Vec::new();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = std::collections::VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &e in &graph.outgoing[v] {
                let w = graph.edges[e].target;
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        // Dependency accumulation
        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                if sigma[w] > 0.0 {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    let norm = ((n - 1) * (n - 2)) as f64;
    for c in &mut centrality {
        *c /= norm;
    }
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CorrelationEdge;

    fn edge(source: usize, target: usize, strength: f64) -> CorrelationEdge {
        CorrelationEdge {
            source,
            target,
            source_kpi: format!("k{source}"),
            target_kpi: format!("k{target}"),
            lag: 1,
            pearson_r: strength,
            spearman_rho: strength,
            strength,
            causality_p: 0.01,
        }
    }

    #[test]
    fn pagerank_favors_sink_of_strong_edges() {
        // 0 -> 2, 1 -> 2: node 2 is the dominant KPI
        let mut g = KpiGraph::with_nodes(&["a", "b", "c"]);
        g.add_edge(edge(0, 2, 0.8));
        g.add_edge(edge(1, 2, 0.8));
        let pr = pagerank(&g, &CorrelationConfig::default());
        assert!(pr[2] > pr[0]);
        assert!(pr[2] > pr[1]);
        // Probability mass sums to ~1
        assert!((pr.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn betweenness_finds_bridge() {
        // 0 -> 1 -> 2: node 1 bridges
        let mut g = KpiGraph::with_nodes(&["a", "b", "c"]);
        g.add_edge(edge(0, 1, 0.7));
        g.add_edge(edge(1, 2, 0.7));
        let bc = betweenness(&g);
        assert!(bc[1] > bc[0]);
        assert!(bc[1] > bc[2]);
    }

    #[test]
    fn empty_graph_no_panic() {
        let g = KpiGraph::default();
        assert!(pagerank(&g, &CorrelationConfig::default()).is_empty());
        assert!(betweenness(&g).is_empty());
    }

    #[test]
    fn annotate_writes_both_measures() {
        let mut g = KpiGraph::with_nodes(&["a", "b", "c"]);
        g.add_edge(edge(0, 1, 0.9));
        g.add_edge(edge(1, 2, 0.9));
        annotate_centrality(&mut g, &CorrelationConfig::default());
        assert!(g.nodes.iter().all(|n| n.pagerank > 0.0));
        assert!(g.nodes[1].betweenness > 0.0);
    }
}

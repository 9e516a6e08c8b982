use std::collections::BTreeMap;
use log::{info, warn};
use serde::Serialize;
use crate::analysis::coexpression_graph::{CoexpressionGraph, GeneIndex};
use crate::analysis::community_detection::CommunityID;
use crate::utils::params::CentralityParams;

#[derive(Debug, Clone)]
pub struct CentralityScores {
    pub scores: BTreeMap<GeneIndex, f64>,
    pub converged: bool,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityRow {
    pub community: CommunityID,
    pub rank: usize,
    pub gene: String,
    pub pagerank: f64,
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Weighted PageRank by power iteration. Dangling mass is spread uniformly.
/// Convergence is reached when the L1 change drops below `n * tolerance`;
/// otherwise the last iterate is returned with `converged = false`.
pub fn pagerank(graph: &CoexpressionGraph, params: &CentralityParams) -> CentralityScores {
    let nodes = graph.nodes();
    let n = nodes.len();
    if n == 0 {
        return CentralityScores {
            scores: BTreeMap::new(),
            converged: true,
            iterations: 0,
        };
    }

    let position: BTreeMap<GeneIndex, usize> = nodes
        .iter()
        .enumerate()
        .map(|(position, &node)| (node, position))
        .collect();

    let out_weight: Vec<f64> = nodes.iter().map(|&node| graph.weighted_degree(node)).collect();
    let transitions: Vec<Vec<(usize, f64)>> = nodes
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            if out_weight[i] <= 0.0 {
                return Vec::new();
            }
            graph
                .graph()
                .edges(node)
                .map(|(_, neighbor, &weight)| (position[&neighbor], weight / out_weight[i]))
                .collect()
        })
        .collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] <= 0.0).collect();

    let uniform = 1.0 / n as f64;
    let damping = params.damping;
    let mut x = vec![uniform; n];
    let mut converged = false;
    let mut iterations = 0;

    for _ in 0..params.max_iterations {
        iterations += 1;
        let dangling_mass: f64 = dangling.iter().map(|&i| x[i]).sum();
        let mut next = vec![(1.0 - damping) * uniform + damping * dangling_mass * uniform; n];
        for (i, row) in transitions.iter().enumerate() {
            for &(j, probability) in row {
                next[j] += damping * x[i] * probability;
            }
        }

        let error: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if error < n as f64 * params.tolerance {
            converged = true;
            break;
        }
    }

    let total: f64 = x.iter().sum();
    if total > 0.0 {
        for value in x.iter_mut() {
            *value /= total;
        }
    }

    if !converged {
        warn!(
            "PageRank did not converge within {} iterations; using last iterate",
            params.max_iterations
        );
    }

    CentralityScores {
        scores: nodes.into_iter().zip(x).collect(),
        converged,
        iterations,
    }
}

/// Top `top_n` genes of each community by descending score, ties by gene id.
pub fn rank_within_communities(
    graph: &CoexpressionGraph,
    assignments: &BTreeMap<GeneIndex, CommunityID>,
    centrality: &CentralityScores,
    top_n: usize,
) -> Vec<CentralityRow> {
    let mut members: BTreeMap<CommunityID, Vec<(GeneIndex, f64)>> = BTreeMap::new();
    for (&node, &community) in assignments {
        if let Some(&score) = centrality.scores.get(&node) {
            members.entry(community).or_default().push((node, score));
        }
    }

    let n_communities = members.len();
    let mut rows = Vec::new();
    for (community, mut genes) in members {
        genes.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| graph.gene_name(a.0).cmp(graph.gene_name(b.0)))
        });
        for (rank, (node, score)) in genes.into_iter().take(top_n).enumerate() {
            rows.push(CentralityRow {
                community,
                rank: rank + 1,
                gene: graph.gene_name(node).to_string(),
                pagerank: round_to(score, 6),
            });
        }
    }

    info!("Ranked top {} genes in each of {} communities", top_n, n_communities);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn graph_from_edges(n: usize, edges: &[(usize, usize, f64)]) -> CoexpressionGraph {
        let mut graph = CoexpressionGraph::new((0..n).map(|i| format!("G{}", i)).collect());
        for &(a, b, weight) in edges {
            graph.add_edge(a, b, weight);
        }
        graph
    }

    #[test]
    fn scores_sum_to_one_on_connected_graph() {
        let graph = graph_from_edges(
            5,
            &[(0, 1, 0.9), (1, 2, 0.8), (2, 3, 0.75), (3, 4, 0.95), (4, 0, 0.71), (1, 3, 0.8)],
        );
        let result = pagerank(&graph, &CentralityParams::default());
        assert!(result.converged);
        let total: f64 = result.scores.values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        assert!(result.scores.values().all(|&score| score >= 0.0));
    }

    #[test]
    fn hub_ranks_first() {
        let graph = graph_from_edges(4, &[(0, 1, 0.8), (0, 2, 0.8), (0, 3, 0.8)]);
        let result = pagerank(&graph, &CentralityParams::default());
        let hub = result.scores[&0];
        assert!(result.scores.iter().all(|(&node, &score)| node == 0 || score < hub));
    }

    #[test]
    fn edgeless_graph_is_uniform() {
        let mut graph = CoexpressionGraph::new((0..4).map(|i| format!("G{}", i)).collect());
        for node in 0..4 {
            graph.add_node(node);
        }
        let result = pagerank(&graph, &CentralityParams::default());
        assert!(result.converged);
        for score in result.scores.values() {
            assert_relative_eq!(*score, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn exhausted_budget_is_flagged() {
        let graph = graph_from_edges(4, &[(0, 1, 0.8), (0, 2, 0.8), (0, 3, 0.8)]);
        let params = CentralityParams { max_iterations: 1, ..Default::default() };
        let result = pagerank(&graph, &params);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        let total: f64 = result.scores.values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ranking_breaks_ties_by_gene_and_truncates() {
        // Triangle is regular, so all three scores tie.
        let graph = graph_from_edges(3, &[(0, 1, 0.9), (1, 2, 0.9), (0, 2, 0.9)]);
        let assignments: BTreeMap<GeneIndex, CommunityID> = [(0, 0), (1, 0), (2, 0)].into_iter().collect();
        let result = pagerank(&graph, &CentralityParams::default());
        let rows = rank_within_communities(&graph, &assignments, &result, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gene, "G0");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].gene, "G1");
        assert_relative_eq!(rows[0].pagerank, 0.333333, epsilon = 1e-12);
    }

    #[test]
    fn rounding_to_six_digits() {
        assert_relative_eq!(round_to(0.123456789, 6), 0.123457, epsilon = 1e-15);
    }
}

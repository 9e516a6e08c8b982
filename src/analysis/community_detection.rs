//! Louvain community detection over the co-expression graph, followed by
//! size pruning and dense relabelling.
//!
//! The Louvain variant follows the networkx formulation. With total edge weight
//! `m`, resolution `γ`, weighted degree `k_u` and community degree sum `Σ_tot(c)`,
//! moving node `u` into a neighbouring community `c` gains
//!
//! ```text
//! gain(c) = w(u, c) / m - γ · Σ_tot(c) · k_u / (2m²)
//! ```
//!
//! measured against the cost of taking `u` out of its own community. Nodes are
//! visited in an order shuffled once per level by a seeded `StdRng`; a node moves
//! only for a strictly positive net gain, and among equal gains the first
//! community met among the node's neighbours wins. Passes repeat until no node
//! moves, then communities are collapsed into weighted super-nodes. Levels stop
//! once modularity improves by no more than `1e-7`.

use std::collections::{BTreeMap, BTreeSet};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::analysis::coexpression_graph::{CoexpressionGraph, GeneIndex};
use crate::parsers::expression_parser::GeneID;

pub type CommunityID = usize;

const MODULARITY_THRESHOLD: f64 = 1e-7;

/// Gene to community assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    membership: BTreeMap<GeneID, CommunityID>,
}

impl Partition {
    pub fn insert(&mut self, gene: GeneID, community: CommunityID) -> Option<CommunityID> {
        self.membership.insert(gene, community)
    }

    pub fn get(&self, gene: &str) -> Option<CommunityID> {
        self.membership.get(gene).copied()
    }

    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CommunityID)> {
        self.membership.iter().map(|(gene, &community)| (gene.as_str(), community))
    }

    pub fn n_communities(&self) -> usize {
        self.membership.values().collect::<BTreeSet<_>>().len()
    }

    /// Members of each community, genes in ascending order.
    pub fn communities(&self) -> BTreeMap<CommunityID, Vec<GeneID>> {
        let mut communities: BTreeMap<CommunityID, Vec<GeneID>> = BTreeMap::new();
        for (gene, &community) in &self.membership {
            communities.entry(community).or_default().push(gene.clone());
        }
        communities
    }

    /// Rows ordered by community id, then gene.
    pub fn sorted_rows(&self) -> Vec<(&str, CommunityID)> {
        let mut rows: Vec<(&str, CommunityID)> = self.iter().collect();
        rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

#[derive(Debug, Clone)]
pub struct CommunityResult {
    pub graph: CoexpressionGraph,
    pub assignments: BTreeMap<GeneIndex, CommunityID>,
    pub partition: Partition,
    pub raw_communities: usize,
    pub pruned_communities: usize,
    pub pruned_genes: usize,
}

/// Compact weighted graph used between Louvain levels.
#[derive(Debug, Clone)]
struct LouvainGraph {
    neighbors: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    total_weight: f64,
}

impl LouvainGraph {
    fn from_coexpression(graph: &CoexpressionGraph, order: &[GeneIndex]) -> Self {
        let position: FxHashMap<GeneIndex, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position))
            .collect();

        let mut neighbors = vec![Vec::new(); order.len()];
        let mut total_weight = 0.0;
        for (a, b, weight) in graph.edges() {
            let (pa, pb) = (position[&a], position[&b]);
            neighbors[pa].push((pb, weight));
            neighbors[pb].push((pa, weight));
            total_weight += weight;
        }
        for list in neighbors.iter_mut() {
            list.sort_by(|x, y| x.0.cmp(&y.0));
        }

        let degrees = neighbors
            .iter()
            .map(|list| list.iter().map(|&(_, weight)| weight).sum())
            .collect();

        Self {
            neighbors,
            self_loops: vec![0.0; order.len()],
            degrees,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.degrees.len()
    }

    fn modularity(&self, node_to_community: &[usize], resolution: f64) -> f64 {
        let m = self.total_weight;
        if m <= 0.0 {
            return 0.0;
        }
        let mut internal: FxHashMap<usize, f64> = FxHashMap::default();
        let mut degree_sum: FxHashMap<usize, f64> = FxHashMap::default();

        for u in 0..self.len() {
            let community = node_to_community[u];
            *degree_sum.entry(community).or_insert(0.0) += self.degrees[u];
            *internal.entry(community).or_insert(0.0) += self.self_loops[u];
            for &(v, weight) in &self.neighbors[u] {
                if u < v && node_to_community[v] == community {
                    *internal.entry(community).or_insert(0.0) += weight;
                }
            }
        }

        degree_sum
            .iter()
            .map(|(community, &k)| {
                let l = internal.get(community).copied().unwrap_or(0.0);
                l / m - resolution * (k / (2.0 * m)).powi(2)
            })
            .sum()
    }

    /// One round of local moves. Returns dense community labels numbered by
    /// first appearance in node order, and whether any node moved.
    fn one_level(&self, resolution: f64, rng: &mut StdRng) -> (Vec<usize>, bool) {
        let n = self.len();
        let m = self.total_weight;
        let mut node_to_community: Vec<usize> = (0..n).collect();
        let mut community_degree = self.degrees.clone();
        let mut improved = false;

        let mut visit_order: Vec<usize> = (0..n).collect();
        visit_order.shuffle(rng);

        loop {
            let mut moves = 0;
            for &u in &visit_order {
                let current = node_to_community[u];
                let degree = self.degrees[u];

                let mut weights_to_community: Vec<(usize, f64)> = Vec::new();
                let mut slot: FxHashMap<usize, usize> = FxHashMap::default();
                for &(v, weight) in &self.neighbors[u] {
                    let community = node_to_community[v];
                    match slot.get(&community) {
                        Some(&index) => weights_to_community[index].1 += weight,
                        None => {
                            slot.insert(community, weights_to_community.len());
                            weights_to_community.push((community, weight));
                        }
                    }
                }

                community_degree[current] -= degree;
                let own_weight = slot
                    .get(&current)
                    .map(|&index| weights_to_community[index].1)
                    .unwrap_or(0.0);
                let remove_cost = -own_weight / m
                    + resolution * community_degree[current] * degree / (2.0 * m * m);

                let mut best_gain = 0.0;
                let mut best_community = current;
                for &(community, weight) in &weights_to_community {
                    let gain = remove_cost + weight / m
                        - resolution * community_degree[community] * degree / (2.0 * m * m);
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = community;
                    }
                }

                community_degree[best_community] += degree;
                if best_community != current {
                    node_to_community[u] = best_community;
                    moves += 1;
                    improved = true;
                }
            }
            if moves == 0 {
                break;
            }
        }

        (renumber(&node_to_community), improved)
    }

    /// Collapses each community into a single node carrying its internal weight as a self-loop.
    fn aggregate(&self, node_to_community: &[usize]) -> Self {
        let k = node_to_community.iter().max().map_or(0, |&max| max + 1);
        let mut self_loops = vec![0.0; k];
        let mut between: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); k];

        for u in 0..self.len() {
            let cu = node_to_community[u];
            self_loops[cu] += self.self_loops[u];
            for &(v, weight) in &self.neighbors[u] {
                if u >= v {
                    continue;
                }
                let cv = node_to_community[v];
                if cu == cv {
                    self_loops[cu] += weight;
                } else {
                    *between[cu].entry(cv).or_insert(0.0) += weight;
                    *between[cv].entry(cu).or_insert(0.0) += weight;
                }
            }
        }

        let neighbors: Vec<Vec<(usize, f64)>> = between
            .into_iter()
            .map(|map| map.into_iter().collect())
            .collect();
        let degrees = neighbors
            .iter()
            .zip(&self_loops)
            .map(|(list, &loop_weight)| {
                list.iter().map(|&(_, weight)| weight).sum::<f64>() + 2.0 * loop_weight
            })
            .collect();

        Self {
            neighbors,
            self_loops,
            degrees,
            total_weight: self.total_weight,
        }
    }
}

fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping: FxHashMap<usize, usize> = FxHashMap::default();
    labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}

/// Raw Louvain assignment for every node of `graph`. Ids are numbered by first
/// appearance in node order.
pub fn louvain_communities(
    graph: &CoexpressionGraph,
    resolution: f64,
    seed: u64,
) -> BTreeMap<GeneIndex, CommunityID> {
    let order = graph.nodes();
    if order.is_empty() {
        return BTreeMap::new();
    }

    let mut level_graph = LouvainGraph::from_coexpression(graph, &order);
    let mut membership: Vec<usize> = (0..order.len()).collect();

    if level_graph.total_weight > 0.0 {
        let mut rng = StdRng::seed_from_u64(seed);
        let identity: Vec<usize> = (0..order.len()).collect();
        let mut modularity = level_graph.modularity(&identity, resolution);
        let mut level = 0;

        loop {
            let (node_to_community, improved) = level_graph.one_level(resolution, &mut rng);
            for community in membership.iter_mut() {
                *community = node_to_community[*community];
            }
            if !improved {
                break;
            }

            let new_modularity = level_graph.modularity(&node_to_community, resolution);
            level += 1;
            debug!(
                "Louvain level {}: {} communities, modularity {:.6}",
                level,
                node_to_community.iter().max().map_or(0, |&max| max + 1),
                new_modularity
            );
            if new_modularity - modularity <= MODULARITY_THRESHOLD {
                break;
            }
            modularity = new_modularity;
            level_graph = level_graph.aggregate(&node_to_community);
        }
    }

    let labels = renumber(&membership);
    order.into_iter().zip(labels).collect()
}

/// Drops every community with `count <= min_community_size` members, removes those
/// genes from the graph and relabels surviving ids by ascending raw id.
pub fn prune_communities(
    graph: &CoexpressionGraph,
    raw: &BTreeMap<GeneIndex, CommunityID>,
    min_community_size: usize,
) -> CommunityResult {
    let mut counts: BTreeMap<CommunityID, usize> = BTreeMap::new();
    for &community in raw.values() {
        *counts.entry(community).or_insert(0) += 1;
    }

    let surviving: BTreeMap<CommunityID, CommunityID> = counts
        .iter()
        .filter(|(_, &count)| count > min_community_size)
        .map(|(&raw_id, _)| raw_id)
        .enumerate()
        .map(|(final_id, raw_id)| (raw_id, final_id))
        .collect();

    let removed: FxHashSet<GeneIndex> = raw
        .iter()
        .filter(|(_, community)| !surviving.contains_key(*community))
        .map(|(&node, _)| node)
        .collect();

    let pruned_graph = graph.without_nodes(&removed);
    let mut assignments = BTreeMap::new();
    let mut partition = Partition::default();
    for (&node, raw_id) in raw {
        if let Some(&final_id) = surviving.get(raw_id) {
            assignments.insert(node, final_id);
            partition.insert(graph.gene_name(node).to_string(), final_id);
        }
    }

    CommunityResult {
        graph: pruned_graph,
        assignments,
        partition,
        raw_communities: counts.len(),
        pruned_communities: counts.len() - surviving.len(),
        pruned_genes: removed.len(),
    }
}

pub fn detect_communities(
    graph: &CoexpressionGraph,
    resolution: f64,
    min_community_size: usize,
    seed: u64,
) -> CommunityResult {
    let raw = louvain_communities(graph, resolution, seed);
    let result = prune_communities(graph, &raw, min_community_size);
    info!(
        "Detected {} communities at resolution {}, kept {} with more than {} members",
        result.raw_communities,
        resolution,
        result.partition.n_communities(),
        min_community_size
    );
    result
}

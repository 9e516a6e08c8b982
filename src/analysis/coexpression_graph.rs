use std::collections::BTreeSet;
use petgraph::graphmap::UnGraphMap;
use rustc_hash::FxHashSet;
use log::info;
use crate::analysis::correlation::SimilarityMatrix;
use crate::parsers::expression_parser::GeneID;

pub type GeneIndex = usize;
pub type EdgeWeight = f64;
pub type GeneNetworkGraph = UnGraphMap<GeneIndex, EdgeWeight>;

/// Undirected weighted co-expression network. Nodes are indices into `genes`.
#[derive(Debug, Clone)]
pub struct CoexpressionGraph {
    genes: Vec<GeneID>,
    graph: GeneNetworkGraph,
}

impl CoexpressionGraph {
    pub fn new(genes: Vec<GeneID>) -> Self {
        Self {
            genes,
            graph: UnGraphMap::new(),
        }
    }

    /// Adds every pair whose correlation is defined and strictly above `threshold`.
    /// Genes without such a pair are left out of the graph.
    pub fn from_similarity(
        matrix: &SimilarityMatrix,
        genes: &[GeneID],
        threshold: f64,
    ) -> Self {
        let n = matrix.size();
        let mut edges = Vec::new();
        let mut nodes = BTreeSet::new();

        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(weight) = matrix.get(i, j) {
                    if weight > threshold {
                        edges.push((i, j, weight));
                        nodes.insert(i);
                        nodes.insert(j);
                    }
                }
            }
        }

        let mut network = Self::new(genes.to_vec());
        for node in nodes {
            network.graph.add_node(node);
        }
        for (i, j, weight) in edges {
            network.graph.add_edge(i, j, weight);
        }

        info!(
            "Built co-expression graph with {} nodes and {} edges (threshold {})",
            network.node_count(),
            network.edge_count(),
            threshold
        );
        network
    }

    pub fn add_node(&mut self, node: GeneIndex) {
        if node < self.genes.len() {
            self.graph.add_node(node);
        }
    }

    /// Inserts an edge unless it is a self-loop, has a non-finite weight or
    /// refers to an unknown gene. An existing edge keeps its weight.
    pub fn add_edge(&mut self, a: GeneIndex, b: GeneIndex, weight: EdgeWeight) -> bool {
        if a == b
            || !weight.is_finite()
            || a >= self.genes.len()
            || b >= self.genes.len()
            || self.graph.contains_edge(a, b)
        {
            return false;
        }
        self.graph.add_edge(a, b, weight);
        true
    }

    pub fn genes(&self) -> &[GeneID] {
        &self.genes
    }

    pub fn gene_name(&self, node: GeneIndex) -> &str {
        &self.genes[node]
    }

    pub fn graph(&self) -> &GeneNetworkGraph {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> Vec<GeneIndex> {
        self.graph.nodes().collect()
    }

    pub fn contains_node(&self, node: GeneIndex) -> bool {
        self.graph.contains_node(node)
    }

    pub fn edge_weight(&self, a: GeneIndex, b: GeneIndex) -> Option<EdgeWeight> {
        self.graph.edge_weight(a, b).copied()
    }

    pub fn edges(&self) -> Vec<(GeneIndex, GeneIndex, EdgeWeight)> {
        self.graph
            .all_edges()
            .map(|(a, b, &weight)| (a.min(b), a.max(b), weight))
            .collect()
    }

    pub fn weighted_degree(&self, node: GeneIndex) -> f64 {
        self.graph.edges(node).map(|(_, _, &weight)| weight).sum()
    }

    /// Copy of the graph without `removed` and their incident edges.
    pub fn without_nodes(&self, removed: &FxHashSet<GeneIndex>) -> Self {
        let mut pruned = Self::new(self.genes.clone());
        for node in self.graph.nodes().filter(|node| !removed.contains(node)) {
            pruned.graph.add_node(node);
        }
        for (a, b, weight) in self.edges() {
            if !removed.contains(&a) && !removed.contains(&b) {
                pruned.graph.add_edge(a, b, weight);
            }
        }
        pruned
    }

    pub fn isolated_gene_count(&self) -> usize {
        self.genes.len() - self.node_count()
    }
}

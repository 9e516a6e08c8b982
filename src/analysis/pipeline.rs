use log::info;
use crate::analysis::centrality::{pagerank, rank_within_communities, CentralityRow, CentralityScores};
use crate::analysis::coexpression_graph::CoexpressionGraph;
use crate::analysis::community_detection::{detect_communities, CommunityResult, Partition};
use crate::analysis::correlation::correlation_matrix;
use crate::analysis::gene_sets::{gene_sets_from_partition, resolve_gene_sets, GeneSet};
use crate::analysis::ssgsea::{score_gene_sets, EnrichmentScores};
use crate::analysis::summary::{summarize_gene_sets, GeneSetSummary};
use crate::parsers::expression_parser::ExpressionTable;
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::{CoexError, Result};
use crate::utils::params::{EnrichmentParams, NetworkParams};

#[derive(Debug, Clone)]
pub struct NetworkAnalysis {
    pub network: CoexpressionGraph,
    pub communities: CommunityResult,
    pub centrality: CentralityScores,
    pub top_genes: Vec<CentralityRow>,
    pub gene_sets: Vec<GeneSet>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct EnrichmentAnalysis {
    pub gene_sets: Vec<GeneSet>,
    pub scores: EnrichmentScores,
    pub summaries: Vec<GeneSetSummary>,
    pub diagnostics: Diagnostics,
}

/// Correlation, thresholded graph, communities, centrality and gene sets for one condition.
pub fn build_network(
    table: &ExpressionTable,
    params: &NetworkParams,
    prefix: &str,
) -> Result<NetworkAnalysis> {
    params.validate()?;
    if table.n_genes() == 0 {
        return Err(CoexError::EmptyInput("expression table has no genes".to_string()));
    }

    let mut diagnostics = Diagnostics::default();

    let matrix = correlation_matrix(table);
    diagnostics.undefined_correlations = matrix.undefined_pairs();

    let network = CoexpressionGraph::from_similarity(&matrix, table.genes(), params.threshold);
    diagnostics.isolated_genes = network.isolated_gene_count();

    let communities = detect_communities(
        &network,
        params.resolution,
        params.min_community_size,
        params.seed,
    );
    diagnostics.raw_communities = communities.raw_communities;
    diagnostics.pruned_communities = communities.pruned_communities;
    diagnostics.pruned_genes = communities.pruned_genes;

    let centrality = pagerank(&communities.graph, &params.centrality);
    diagnostics.centrality_converged = Some(centrality.converged);
    diagnostics.centrality_iterations = centrality.iterations;

    let top_genes = rank_within_communities(
        &communities.graph,
        &communities.assignments,
        &centrality,
        params.centrality.top_n,
    );
    let gene_sets = gene_sets_from_partition(&communities.partition, prefix);

    info!(
        "Network analysis finished: {} genes in {} communities",
        communities.partition.len(),
        communities.partition.n_communities()
    );

    Ok(NetworkAnalysis {
        network,
        communities,
        centrality,
        top_genes,
        gene_sets,
        diagnostics,
    })
}

/// Scores the communities of a source partition in every sample of the target table.
pub fn project_partition(
    partition: &Partition,
    prefix: &str,
    target: &ExpressionTable,
    params: &EnrichmentParams,
    condition: Option<&str>,
) -> Result<EnrichmentAnalysis> {
    let gene_sets = gene_sets_from_partition(partition, prefix);
    score_projected_sets(gene_sets, target, params, condition)
}

pub fn score_projected_sets(
    gene_sets: Vec<GeneSet>,
    target: &ExpressionTable,
    params: &EnrichmentParams,
    condition: Option<&str>,
) -> Result<EnrichmentAnalysis> {
    params.validate()?;
    let mut diagnostics = Diagnostics::default();

    let screen = resolve_gene_sets(&gene_sets, target, params.min_set_size);
    diagnostics.unknown_set_members = screen.unknown_members;
    diagnostics.excluded_sets = screen.excluded;

    let scores = score_gene_sets(target, &screen.accepted, params);
    diagnostics.undefined_scores = scores.undefined_count();

    let (summaries, unscored) = summarize_gene_sets(&scores, &screen.accepted, condition);
    diagnostics.excluded_sets.extend(unscored);

    Ok(EnrichmentAnalysis {
        gene_sets,
        scores,
        summaries,
        diagnostics,
    })
}

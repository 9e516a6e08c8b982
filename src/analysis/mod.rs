pub mod centrality;
pub mod coexpression_graph;
pub mod community_detection;
pub mod correlation;
pub mod gene_sets;
pub mod interpretation;
pub mod pipeline;
pub mod ssgsea;
pub mod summary;
pub mod write_results;

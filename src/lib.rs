//! Gene co-expression network analysis: correlation network construction,
//! Louvain community detection, PageRank ranking of genes within communities,
//! and single-sample enrichment of community gene sets in a second condition.

pub mod analysis;
pub mod parsers;
pub mod utils;

pub use utils::error::{CoexError, Result};

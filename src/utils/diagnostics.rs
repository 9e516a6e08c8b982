use std::fmt;
use log::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    NoMembersInTarget,
    BelowMinimumSize { present: usize, minimum: usize },
    NoDefinedScores,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NoMembersInTarget => {
                write!(f, "no members present in target expression table")
            }
            ExclusionReason::BelowMinimumSize { present, minimum } => {
                write!(f, "{} members present, minimum is {}", present, minimum)
            }
            ExclusionReason::NoDefinedScores => {
                write!(f, "enrichment score undefined in every target sample")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedGeneSet {
    pub name: String,
    pub n_members: usize,
    pub n_present: usize,
    pub reason: ExclusionReason,
}

/// Absorbed data problems, reported next to the regular output.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub missing_cells: usize,
    pub duplicate_genes: usize,
    pub unknown_selected_genes: usize,
    pub undefined_correlations: usize,
    pub isolated_genes: usize,
    pub raw_communities: usize,
    pub pruned_communities: usize,
    pub pruned_genes: usize,
    pub centrality_converged: Option<bool>,
    pub centrality_iterations: usize,
    pub unknown_set_members: usize,
    pub undefined_scores: usize,
    pub excluded_sets: Vec<ExcludedGeneSet>,
}

impl Diagnostics {
    pub fn merge(&mut self, other: Diagnostics) {
        self.missing_cells += other.missing_cells;
        self.duplicate_genes += other.duplicate_genes;
        self.unknown_selected_genes += other.unknown_selected_genes;
        self.undefined_correlations += other.undefined_correlations;
        self.isolated_genes += other.isolated_genes;
        self.raw_communities += other.raw_communities;
        self.pruned_communities += other.pruned_communities;
        self.pruned_genes += other.pruned_genes;
        if other.centrality_converged.is_some() {
            self.centrality_converged = other.centrality_converged;
            self.centrality_iterations = other.centrality_iterations;
        }
        self.unknown_set_members += other.unknown_set_members;
        self.undefined_scores += other.undefined_scores;
        self.excluded_sets.extend(other.excluded_sets);
    }

    pub fn log_summary(&self) {
        if self.missing_cells > 0 {
            info!("{} expression cells were missing or non-numeric", self.missing_cells);
        }
        if self.duplicate_genes > 0 {
            warn!("{} duplicate gene rows were ignored", self.duplicate_genes);
        }
        if self.unknown_selected_genes > 0 {
            warn!(
                "{} selected genes were not found in the expression table",
                self.unknown_selected_genes
            );
        }
        if self.undefined_correlations > 0 {
            info!("{} gene pairs had an undefined correlation", self.undefined_correlations);
        }
        if self.isolated_genes > 0 {
            info!("{} genes had no edge above threshold", self.isolated_genes);
        }
        if self.pruned_communities > 0 {
            info!(
                "{} of {} communities pruned ({} genes removed)",
                self.pruned_communities, self.raw_communities, self.pruned_genes
            );
        }
        if self.centrality_converged == Some(false) {
            warn!(
                "PageRank did not converge after {} iterations, scores are approximate",
                self.centrality_iterations
            );
        }
        if self.unknown_set_members > 0 {
            info!(
                "{} gene set members were absent from the target table",
                self.unknown_set_members
            );
        }
        if self.undefined_scores > 0 {
            info!("{} sample/gene set scores were undefined", self.undefined_scores);
        }
        for excluded in &self.excluded_sets {
            warn!("Gene set {} excluded: {}", excluded.name, excluded.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_counts_and_exclusions() {
        let mut first = Diagnostics {
            undefined_correlations: 2,
            ..Default::default()
        };
        let second = Diagnostics {
            undefined_correlations: 3,
            centrality_converged: Some(true),
            centrality_iterations: 12,
            excluded_sets: vec![ExcludedGeneSet {
                name: "healthy-1".to_string(),
                n_members: 5,
                n_present: 0,
                reason: ExclusionReason::NoMembersInTarget,
            }],
            ..Default::default()
        };
        first.merge(second);
        assert_eq!(first.undefined_correlations, 5);
        assert_eq!(first.centrality_converged, Some(true));
        assert_eq!(first.excluded_sets.len(), 1);
    }

    #[test]
    fn reason_text_is_descriptive() {
        let reason = ExclusionReason::BelowMinimumSize { present: 2, minimum: 3 };
        assert_eq!(reason.to_string(), "2 members present, minimum is 3");
    }
}

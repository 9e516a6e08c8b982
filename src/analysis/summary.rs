use serde::Serialize;
use statrs::statistics::Statistics;
use crate::analysis::gene_sets::ResolvedGeneSet;
use crate::analysis::interpretation::Interpretation;
use crate::analysis::ssgsea::EnrichmentScores;
use crate::utils::diagnostics::{ExcludedGeneSet, ExclusionReason};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneSetSummary {
    pub gene_set: String,
    pub n_members: usize,
    pub n_present: usize,
    pub n_samples: usize,
    pub mean_es: Option<f64>,
    pub std_es: Option<f64>,
    pub mean_nes: Option<f64>,
    pub std_nes: Option<f64>,
    pub interpretation: String,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Mean and sample standard deviation (n - 1) over the defined scores.
/// Fewer than two scores leave the standard deviation undefined.
pub fn mean_and_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let mean = finite(values.iter().mean());
    let std = if values.len() < 2 {
        None
    } else {
        finite(values.iter().std_dev())
    };
    (mean, std)
}

/// Per-set summary across samples. The label is derived from the mean NES.
pub fn summarize_gene_sets(
    scores: &EnrichmentScores,
    gene_sets: &[ResolvedGeneSet],
    condition: Option<&str>,
) -> (Vec<GeneSetSummary>, Vec<ExcludedGeneSet>) {
    let mut summaries = Vec::with_capacity(gene_sets.len());
    let mut excluded = Vec::new();

    for (set_index, gene_set) in gene_sets.iter().enumerate() {
        let (es, nes) = scores.set_column(set_index);
        let (mean_es, std_es) = mean_and_std(&es);
        let (mean_nes, std_nes) = mean_and_std(&nes);

        let Some(label_score) = mean_nes else {
            excluded.push(ExcludedGeneSet {
                name: gene_set.name.clone(),
                n_members: gene_set.n_members,
                n_present: gene_set.rows.len(),
                reason: ExclusionReason::NoDefinedScores,
            });
            continue;
        };

        summaries.push(GeneSetSummary {
            gene_set: gene_set.name.clone(),
            n_members: gene_set.n_members,
            n_present: gene_set.rows.len(),
            n_samples: es.len(),
            mean_es,
            std_es,
            mean_nes,
            std_nes,
            interpretation: Interpretation::from_score(label_score).describe(condition),
        });
    }

    (summaries, excluded)
}

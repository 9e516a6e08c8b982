//! Single-sample gene set enrichment.
//!
//! For every sample the genes with a defined value are ranked by expression,
//! highest first, ties broken by gene id. Walking the ranked list of length `N`,
//! a member at 0-based position `i` adds `(N - i)^α / Σ_hits (N - j)^α` to the
//! running sum and a non-member subtracts `1 / (N - N_H)`. The `Cumulative`
//! score is the sum of the running sum over the whole walk (Barbie et al. 2009);
//! `MaxDeviation` keeps the running-sum value furthest from zero.
//!
//! NES divides each score by the range of all defined scores of the run.

use clap::ValueEnum;
use log::info;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use crate::analysis::gene_sets::ResolvedGeneSet;
use crate::parsers::expression_parser::{ExpressionTable, SampleID};
use crate::utils::params::EnrichmentParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScoreVariant {
    Cumulative,
    MaxDeviation,
}

pub type Score = Option<f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow<'a> {
    pub sample: &'a str,
    pub gene_set: &'a str,
    pub es: Score,
    pub nes: Score,
}

/// Scores indexed `[sample][gene set]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentScores {
    pub samples: Vec<SampleID>,
    pub gene_sets: Vec<String>,
    pub es: Vec<Vec<Score>>,
    pub nes: Vec<Vec<Score>>,
}

impl EnrichmentScores {
    pub fn rows(&self) -> Vec<ScoreRow<'_>> {
        let mut rows = Vec::with_capacity(self.samples.len() * self.gene_sets.len());
        for (sample_index, sample) in self.samples.iter().enumerate() {
            for (set_index, gene_set) in self.gene_sets.iter().enumerate() {
                rows.push(ScoreRow {
                    sample,
                    gene_set,
                    es: self.es[sample_index][set_index],
                    nes: self.nes[sample_index][set_index],
                });
            }
        }
        rows
    }

    pub fn undefined_count(&self) -> usize {
        self.es.iter().flatten().filter(|score| score.is_none()).count()
    }

    pub fn set_column(&self, set_index: usize) -> (Vec<f64>, Vec<f64>) {
        let es = self.es.iter().filter_map(|row| row[set_index]).collect();
        let nes = self.nes.iter().filter_map(|row| row[set_index]).collect();
        (es, nes)
    }
}

/// Rows of the genes observed in `sample`, highest expression first.
pub fn rank_sample(table: &ExpressionTable, sample: usize) -> Vec<usize> {
    let mut observed: Vec<(usize, f64)> = (0..table.n_genes())
        .filter_map(|row| table.value(row, sample).map(|value| (row, value)))
        .collect();
    observed.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| table.genes()[a.0].cmp(&table.genes()[b.0]))
    });
    observed.into_iter().map(|(row, _)| row).collect()
}

pub fn running_sum_score(
    ranked: &[usize],
    members: &FxHashSet<usize>,
    weight_exponent: f64,
    variant: ScoreVariant,
) -> Score {
    let n = ranked.len();
    let n_hits = ranked.iter().filter(|row| members.contains(*row)).count();
    if n_hits == 0 || n_hits == n {
        return None;
    }

    let weight = |position: usize| ((n - position) as f64).powf(weight_exponent);
    let hit_total: f64 = ranked
        .iter()
        .enumerate()
        .filter(|(_, row)| members.contains(*row))
        .map(|(position, _)| weight(position))
        .sum();
    let miss_step = 1.0 / (n - n_hits) as f64;

    let mut running = 0.0;
    let mut cumulative = 0.0;
    let mut extreme: f64 = 0.0;
    for (position, row) in ranked.iter().enumerate() {
        if members.contains(row) {
            running += weight(position) / hit_total;
        } else {
            running -= miss_step;
        }
        cumulative += running;
        if running.abs() > extreme.abs() {
            extreme = running;
        }
    }

    Some(match variant {
        ScoreVariant::Cumulative => cumulative,
        ScoreVariant::MaxDeviation => extreme,
    })
}

fn normalize_by_range(es: &[Vec<Score>]) -> Vec<Vec<Score>> {
    let defined: Vec<f64> = es.iter().flatten().flatten().copied().collect();
    let max = defined.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = defined.iter().copied().fold(f64::INFINITY, f64::min);
    let range = max - min;

    es.iter()
        .map(|row| {
            row.iter()
                .map(|score| score.map(|value| if range > 0.0 { value / range } else { value }))
                .collect()
        })
        .collect()
}

pub fn score_gene_sets(
    table: &ExpressionTable,
    gene_sets: &[ResolvedGeneSet],
    params: &EnrichmentParams,
) -> EnrichmentScores {
    info!(
        "Scoring {} gene sets in {} samples ({:?}, weight exponent {})",
        gene_sets.len(),
        table.n_samples(),
        params.variant,
        params.weight_exponent
    );

    let member_sets: Vec<FxHashSet<usize>> = gene_sets
        .iter()
        .map(|gene_set| gene_set.rows.iter().copied().collect())
        .collect();

    let es: Vec<Vec<Score>> = (0..table.n_samples())
        .into_par_iter()
        .map(|sample| {
            let ranked = rank_sample(table, sample);
            member_sets
                .iter()
                .map(|members| {
                    running_sum_score(&ranked, members, params.weight_exponent, params.variant)
                })
                .collect()
        })
        .collect();

    let nes = normalize_by_range(&es);

    EnrichmentScores {
        samples: table.samples().to_vec(),
        gene_sets: gene_sets.iter().map(|gene_set| gene_set.name.clone()).collect(),
        es,
        nes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn members(rows: &[usize]) -> FxHashSet<usize> {
        rows.iter().copied().collect()
    }

    #[test]
    fn cumulative_walk_for_top_and_bottom_member() {
        let ranked = vec![0, 1, 2, 3];
        let top = running_sum_score(&ranked, &members(&[0]), 0.0, ScoreVariant::Cumulative);
        let bottom = running_sum_score(&ranked, &members(&[3]), 0.0, ScoreVariant::Cumulative);
        assert_relative_eq!(top.unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(bottom.unwrap(), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn max_deviation_keeps_sign() {
        let ranked = vec![0, 1, 2, 3];
        let top = running_sum_score(&ranked, &members(&[0]), 0.25, ScoreVariant::MaxDeviation);
        let bottom = running_sum_score(&ranked, &members(&[3]), 0.25, ScoreVariant::MaxDeviation);
        assert_relative_eq!(top.unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(bottom.unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn weight_exponent_favours_top_hits() {
        let ranked = vec![0, 1, 2, 3, 4];
        let flat = running_sum_score(&ranked, &members(&[0, 4]), 0.0, ScoreVariant::Cumulative);
        let weighted = running_sum_score(&ranked, &members(&[0, 4]), 1.0, ScoreVariant::Cumulative);
        assert!(weighted.unwrap() > flat.unwrap());
    }

    #[test]
    fn no_hits_or_all_hits_is_undefined() {
        let ranked = vec![0, 1];
        assert_eq!(running_sum_score(&ranked, &members(&[5]), 0.25, ScoreVariant::Cumulative), None);
        assert_eq!(running_sum_score(&ranked, &members(&[0, 1]), 0.25, ScoreVariant::Cumulative), None);
    }

    #[test]
    fn ranking_skips_missing_and_breaks_ties_by_gene() {
        let table = ExpressionTable::new(
            vec!["C".to_string(), "A".to_string(), "B".to_string(), "D".to_string()],
            vec!["s1".to_string()],
            vec![vec![Some(1.0)], vec![Some(1.0)], vec![Some(5.0)], vec![None]],
        )
        .unwrap();
        assert_eq!(rank_sample(&table, 0), vec![2, 1, 0]);
    }

    #[test]
    fn nes_is_scaled_by_range() {
        let table = ExpressionTable::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()],
            vec!["s1".to_string()],
            vec![vec![Some(4.0)], vec![Some(3.0)], vec![Some(2.0)], vec![Some(1.0)]],
        )
        .unwrap();
        let sets = vec![
            ResolvedGeneSet { name: "up".to_string(), n_members: 1, rows: vec![0] },
            ResolvedGeneSet { name: "down".to_string(), n_members: 1, rows: vec![3] },
        ];
        let params = EnrichmentParams { weight_exponent: 0.0, ..Default::default() };
        let scores = score_gene_sets(&table, &sets, &params);
        assert_relative_eq!(scores.nes[0][0].unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(scores.nes[0][1].unwrap(), -0.5, epsilon = 1e-12);
        assert_eq!(scores.rows().len(), 2);
        assert_eq!(scores.undefined_count(), 0);
    }
}

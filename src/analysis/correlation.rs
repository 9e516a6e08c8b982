use log::info;
use rayon::prelude::*;
use crate::parsers::expression_parser::{ExpressionTable, ExpressionValue};

pub type Correlation = Option<f64>;

/// Square symmetric matrix of gene-gene correlations, indexed like the table's genes.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<Correlation>,
}

impl SimilarityMatrix {
    pub fn from_fn<F>(n: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> Correlation + Sync,
    {
        let upper: Vec<Vec<Correlation>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| f(i, j)).collect())
            .collect();

        let mut values = vec![None; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                let j = i + offset;
                values[i * n + j] = value;
                values[j * n + i] = value;
            }
        }
        Self { n, values }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> Correlation {
        self.values[i * self.n + j]
    }

    /// Number of unordered off-diagonal pairs without a defined correlation.
    pub fn undefined_pairs(&self) -> usize {
        (0..self.n)
            .map(|i| ((i + 1)..self.n).filter(|&j| self.get(i, j).is_none()).count())
            .sum()
    }
}

/// Pearson correlation over the samples observed in both vectors.
pub fn pairwise_pearson(x: &[ExpressionValue], y: &[ExpressionValue]) -> Correlation {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let r = sxy / (sxx * syy).sqrt();
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

pub fn correlation_matrix(table: &ExpressionTable) -> SimilarityMatrix {
    info!(
        "Computing pairwise Pearson correlation for {} genes over {} samples",
        table.n_genes(),
        table.n_samples()
    );
    SimilarityMatrix::from_fn(table.n_genes(), |i, j| {
        pairwise_pearson(table.row(i), table.row(j))
    })
}

use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use csv::ReaderBuilder;
use itertools::Itertools;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::{CoexError, Result};

pub type GeneID = String;
pub type SampleID = String;
pub type ExpressionValue = Option<f64>;

const MISSING_MARKERS: [&str; 6] = ["", "na", "nan", "null", "none", "-"];

/// Gene-by-sample expression values. Rows are genes, columns are samples.
#[derive(Debug, Clone, Default)]
pub struct ExpressionTable {
    genes: Vec<GeneID>,
    samples: Vec<SampleID>,
    values: Vec<Vec<ExpressionValue>>,
    gene_index: FxHashMap<GeneID, usize>,
}

pub fn normalize_gene_id(raw: &str) -> GeneID {
    raw.trim().to_uppercase()
}

pub fn parse_cell(raw: &str) -> ExpressionValue {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|s| s.to_str()) {
        Some("tsv") | Some("txt") | Some("tab") => b'\t',
        _ => b',',
    }
}

impl ExpressionTable {
    pub fn new(
        genes: Vec<GeneID>,
        samples: Vec<SampleID>,
        values: Vec<Vec<ExpressionValue>>,
    ) -> Result<Self> {
        if genes.len() != values.len() {
            return Err(CoexError::schema(
                "expression table",
                format!("{} gene ids for {} value rows", genes.len(), values.len()),
            ));
        }

        let mut gene_index = FxHashMap::with_capacity_and_hasher(
            genes.len(),
            rustc_hash::FxBuildHasher::default()
        );
        for (index, (gene, row)) in genes.iter().zip(&values).enumerate() {
            if row.len() != samples.len() {
                return Err(CoexError::schema(
                    "expression table",
                    format!("gene {} has {} values for {} samples", gene, row.len(), samples.len()),
                ));
            }
            if gene_index.insert(gene.clone(), index).is_some() {
                return Err(CoexError::schema(
                    "expression table",
                    format!("duplicate gene id {}", gene),
                ));
            }
        }

        Ok(Self { genes, samples, values, gene_index })
    }

    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<(Self, Diagnostics)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CoexError::io(path, e))?;
        Self::from_reader(file, delimiter_for(path), &path.to_string_lossy())
    }

    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        source_name: &str,
    ) -> Result<(Self, Diagnostics)> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(CoexError::schema(
                source_name,
                "expected a gene id column followed by at least one sample column",
            ));
        }
        let samples: Vec<SampleID> = headers.iter().skip(1).map(|s| s.trim().to_string()).collect();
        if let Some(duplicate) = samples.iter().duplicates().next() {
            return Err(CoexError::schema(
                source_name,
                format!("duplicate sample column {}", duplicate),
            ));
        }

        let mut diagnostics = Diagnostics::default();
        let mut genes = Vec::new();
        let mut values = Vec::new();
        let mut seen: FxHashSet<GeneID> = FxHashSet::default();

        for result in csv_reader.records() {
            let record = result?;
            let gene = match record.get(0) {
                Some(raw) => normalize_gene_id(raw),
                None => continue,
            };
            if gene.is_empty() {
                continue;
            }
            if !seen.insert(gene.clone()) {
                diagnostics.duplicate_genes += 1;
                continue;
            }

            let row: Vec<ExpressionValue> = record.iter().skip(1).map(parse_cell).collect();
            diagnostics.missing_cells += row.iter().filter(|value| value.is_none()).count();
            genes.push(gene);
            values.push(row);
        }

        if genes.is_empty() {
            return Err(CoexError::EmptyInput(format!("no gene rows in {}", source_name)));
        }

        info!(
            "Loaded expression table with {} genes and {} samples from {}",
            genes.len(),
            samples.len(),
            source_name
        );

        Ok((Self::new(genes, samples, values)?, diagnostics))
    }

    pub fn genes(&self) -> &[GeneID] {
        &self.genes
    }

    pub fn samples(&self) -> &[SampleID] {
        &self.samples
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn row(&self, gene_index: usize) -> &[ExpressionValue] {
        &self.values[gene_index]
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn value(&self, gene_index: usize, sample_index: usize) -> ExpressionValue {
        self.values[gene_index][sample_index]
    }

    /// Restricts the table to the given samples, in the given order.
    pub fn select_samples(&self, sample_ids: &[SampleID]) -> Result<Self> {
        let positions: FxHashMap<&str, usize> = self.samples
            .iter()
            .enumerate()
            .map(|(index, sample)| (sample.as_str(), index))
            .collect();

        let mut columns = Vec::with_capacity(sample_ids.len());
        for sample in sample_ids {
            match positions.get(sample.as_str()) {
                Some(&index) => columns.push(index),
                None => {
                    return Err(CoexError::schema(
                        "sample selection",
                        format!("sample {} is not a column of the expression table", sample),
                    ))
                }
            }
        }
        if columns.is_empty() {
            return Err(CoexError::EmptyInput("sample selection is empty".to_string()));
        }

        let values = self.values
            .iter()
            .map(|row| columns.iter().map(|&column| row[column]).collect())
            .collect();

        Self::new(self.genes.clone(), sample_ids.to_vec(), values)
    }

    /// Restricts the table to the given gene rows, keeping table order.
    pub fn select_gene_indices(&self, indices: &[usize]) -> Self {
        let keep: FxHashSet<usize> = indices.iter().copied().collect();
        let mut genes = Vec::with_capacity(keep.len());
        let mut values = Vec::with_capacity(keep.len());
        let mut gene_index = FxHashMap::default();

        for (index, gene) in self.genes.iter().enumerate() {
            if keep.contains(&index) {
                gene_index.insert(gene.clone(), genes.len());
                genes.push(gene.clone());
                values.push(self.values[index].clone());
            }
        }

        Self {
            genes,
            samples: self.samples.clone(),
            values,
            gene_index,
        }
    }

    /// Rows of the named genes, in request order, and the number of names not found.
    pub fn lookup_genes(&self, gene_ids: &[GeneID]) -> (Vec<usize>, usize) {
        let mut missing = 0;
        let indices: Vec<usize> = gene_ids
            .iter()
            .filter_map(|gene| {
                let found = self.gene_index(&normalize_gene_id(gene));
                if found.is_none() {
                    missing += 1;
                }
                found
            })
            .collect();
        if missing > 0 {
            warn!("{} requested genes are not in the expression table", missing);
        }
        (indices, missing)
    }

    /// Restricts the table to the named genes. Returns the number of names not found.
    pub fn select_genes(&self, gene_ids: &[GeneID]) -> (Self, usize) {
        let (indices, missing) = self.lookup_genes(gene_ids);
        (self.select_gene_indices(&indices), missing)
    }
}

/// Which genes enter network construction.
#[derive(Debug, Clone, Default)]
pub struct GeneSelection {
    pub genes: Option<Vec<GeneID>>,
    pub top_variable: Option<usize>,
    pub random_supplement: usize,
    pub seed: u64,
}

/// Applies a gene selection: an explicit list or the most variable genes, plus
/// `random_supplement` genes drawn from the rest. A supplement without a base
/// selection draws from the whole table. Names not found are counted in
/// `diagnostics.unknown_selected_genes`.
pub fn select_network_genes(
    table: ExpressionTable,
    selection: &GeneSelection,
    diagnostics: &mut Diagnostics,
) -> Result<ExpressionTable> {
    let chosen = if let Some(genes) = &selection.genes {
        let (indices, missing) = table.lookup_genes(genes);
        diagnostics.unknown_selected_genes += missing;
        indices
    } else if let Some(n) = selection.top_variable {
        top_variable_genes(&table, n)
    } else if selection.random_supplement > 0 {
        Vec::new()
    } else {
        return Ok(table);
    };

    let chosen = if selection.random_supplement > 0 {
        supplement_random_genes(&table, &chosen, selection.random_supplement, selection.seed)
    } else {
        chosen
    };
    if chosen.is_empty() {
        return Err(CoexError::EmptyInput(
            "gene selection matched no rows of the expression table".to_string(),
        ));
    }

    info!("Selected {} genes for network construction", chosen.len());
    Ok(table.select_gene_indices(&chosen))
}

/// Sample variance (n - 1) over the defined values of a row.
pub fn row_variance(row: &[ExpressionValue]) -> Option<f64> {
    let observed: Vec<f64> = row.iter().flatten().copied().collect();
    if observed.len() < 2 {
        return None;
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let sum_sq: f64 = observed.iter().map(|value| (value - mean).powi(2)).sum();
    Some(sum_sq / (n - 1.0))
}

/// Indices of the `n` most variable genes, ties broken by gene id. Rows with
/// fewer than two values or zero variance are never chosen.
pub fn top_variable_genes(table: &ExpressionTable, n: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = (0..table.n_genes())
        .filter_map(|index| row_variance(table.row(index)).map(|variance| (index, variance)))
        .filter(|(_, variance)| *variance > 0.0)
        .collect();

    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| table.genes()[a.0].cmp(&table.genes()[b.0]))
    });

    ranked.into_iter().take(n).map(|(index, _)| index).collect()
}

/// Adds `count` genes drawn uniformly from those not already chosen.
pub fn supplement_random_genes(
    table: &ExpressionTable,
    chosen: &[usize],
    count: usize,
    seed: u64,
) -> Vec<usize> {
    let chosen_set: FxHashSet<usize> = chosen.iter().copied().collect();
    let mut pool: Vec<usize> = (0..table.n_genes())
        .filter(|index| !chosen_set.contains(index))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    pool.shuffle(&mut rng);

    let mut selection = chosen.to_vec();
    selection.extend(pool.into_iter().take(count));
    selection.sort_unstable();
    selection
}

pub fn parse_id_list<'a, I>(ids: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>
{
    let mut seen = FxHashSet::default();
    ids.map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Accepts either a path to a file with one id per line or a comma-separated list.
pub fn process_id_list_input(input: &str) -> Result<Vec<String>> {
    let path = Path::new(input);
    let ids = if !input.contains(',') && path.is_file() {
        info!("Reading id list from file: {}", input);
        let content = fs::read_to_string(path).map_err(|e| CoexError::io(path, e))?;
        parse_id_list(content.lines())
    } else {
        parse_id_list(input.split(','))
    };

    if ids.is_empty() {
        return Err(CoexError::EmptyInput(format!("no ids found in '{}'", input)));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "gene,s1,s2,s3\n\
        tp53,1.0,2.0,3.0\n\
        BRCA1,NA,4.5,abc\n\
        tp53,9,9,9\n\
        ,1,2,3\n\
        egfr,0.5,0.5,0.5\n";

    fn load() -> (ExpressionTable, Diagnostics) {
        ExpressionTable::from_reader(TABLE.as_bytes(), b',', "test").unwrap()
    }

    #[test]
    fn parses_table_with_missing_markers() {
        let (table, diagnostics) = load();
        assert_eq!(table.genes(), &["TP53", "BRCA1", "EGFR"]);
        assert_eq!(table.samples(), &["s1", "s2", "s3"]);
        assert_eq!(table.value(1, 0), None);
        assert_eq!(table.value(1, 1), Some(4.5));
        assert_eq!(table.value(1, 2), None);
        assert_eq!(diagnostics.missing_cells, 2);
        assert_eq!(diagnostics.duplicate_genes, 1);
    }

    #[test]
    fn sample_selection_reorders_columns() {
        let (table, _) = load();
        let selected = table
            .select_samples(&["s3".to_string(), "s1".to_string()])
            .unwrap();
        assert_eq!(selected.samples(), &["s3", "s1"]);
        assert_eq!(selected.row(0), &[Some(3.0), Some(1.0)]);
    }

    #[test]
    fn unknown_sample_is_a_schema_error() {
        let (table, _) = load();
        let err = table.select_samples(&["s9".to_string()]).unwrap_err();
        assert!(matches!(err, CoexError::Schema { .. }));
    }

    #[test]
    fn header_only_table_is_rejected() {
        let result = ExpressionTable::from_reader("gene,s1\n".as_bytes(), b',', "empty");
        assert!(matches!(result, Err(CoexError::EmptyInput(_))));
    }

    #[test]
    fn top_variable_skips_constant_and_sparse_rows() {
        let (table, _) = load();
        // BRCA1 has a single observation, EGFR is constant.
        assert_eq!(top_variable_genes(&table, 3), vec![0]);
    }

    #[test]
    fn random_supplement_is_seeded() {
        let genes: Vec<String> = (0..20).map(|i| format!("G{}", i)).collect();
        let values = vec![vec![Some(1.0)]; 20];
        let table = ExpressionTable::new(genes, vec!["s1".to_string()], values).unwrap();

        let first = supplement_random_genes(&table, &[0, 1], 5, 7);
        let second = supplement_random_genes(&table, &[0, 1], 5, 7);
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
        assert!(first.contains(&0) && first.contains(&1));
    }

    #[test]
    fn gene_selection_normalizes_names() {
        let (table, _) = load();
        let (selected, missing) = table.select_genes(&["egfr".to_string(), "myc".to_string()]);
        assert_eq!(selected.genes(), &["EGFR"]);
        assert_eq!(missing, 1);
        assert_eq!(selected.gene_index("EGFR"), Some(0));
    }

    #[test]
    fn unmatched_selected_genes_are_counted() {
        let (table, _) = load();
        let selection = GeneSelection {
            genes: Some(vec!["tp53".to_string(), "myc".to_string(), "kras".to_string()]),
            random_supplement: 1,
            seed: 3,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::default();
        let selected = select_network_genes(table, &selection, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.unknown_selected_genes, 2);
        assert_eq!(selected.n_genes(), 2);
        assert_eq!(selected.gene_index("TP53"), Some(0));
    }

    #[test]
    fn supplement_alone_draws_from_whole_table() {
        let (table, _) = load();
        let selection = GeneSelection { random_supplement: 2, seed: 9, ..Default::default() };
        let mut diagnostics = Diagnostics::default();
        let first = select_network_genes(table.clone(), &selection, &mut diagnostics).unwrap();
        let second = select_network_genes(table, &selection, &mut diagnostics).unwrap();
        assert_eq!(first.n_genes(), 2);
        assert_eq!(first.genes(), second.genes());
    }

    #[test]
    fn selection_without_matches_is_rejected() {
        let (table, _) = load();
        let selection = GeneSelection {
            genes: Some(vec!["myc".to_string()]),
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::default();
        let result = select_network_genes(table, &selection, &mut diagnostics);
        assert!(matches!(result, Err(CoexError::EmptyInput(_))));
        assert_eq!(diagnostics.unknown_selected_genes, 1);
    }

    #[test]
    fn empty_selection_keeps_table() {
        let (table, _) = load();
        let mut diagnostics = Diagnostics::default();
        let kept = select_network_genes(table, &GeneSelection::default(), &mut diagnostics).unwrap();
        assert_eq!(kept.n_genes(), 3);
    }

    #[test]
    fn id_list_deduplicates() {
        assert_eq!(parse_id_list("a, b,,a".split(',')), vec!["a", "b"]);
    }
}

use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use csv::WriterBuilder;
use log::info;
use serde::Serialize;
use crate::analysis::pipeline::{EnrichmentAnalysis, NetworkAnalysis};
use crate::parsers::gmt_parser::write_gmt_file;
use crate::parsers::partition_parser::write_partition_file;
use crate::utils::error::{CoexError, Result};

const BUFFER_SIZE: usize = 8192 * 32;

pub const EDGE_HEADERS: [&str; 3] = ["source", "target", "weight"];
pub const CENTRALITY_HEADERS: [&str; 4] = ["community", "rank", "gene", "pagerank"];
pub const SCORE_HEADERS: [&str; 4] = ["sample", "gene_set", "es", "nes"];
pub const SUMMARY_HEADERS: [&str; 9] = [
    "gene_set",
    "n_members",
    "n_present",
    "n_samples",
    "mean_es",
    "std_es",
    "mean_nes",
    "std_nes",
    "interpretation",
];
pub const EXCLUDED_HEADERS: [&str; 4] = ["gene_set", "n_members", "n_present", "reason"];

#[derive(Debug, Serialize)]
struct EdgeRow<'a> {
    source: &'a str,
    target: &'a str,
    weight: f64,
}

#[derive(Debug, Serialize)]
struct ExcludedRow<'a> {
    gene_set: &'a str,
    n_members: usize,
    n_present: usize,
    reason: String,
}

/// Writes `headers` followed by one record per row. The header line is present
/// even when `rows` is empty.
pub fn write_table<T: Serialize>(
    rows: &[T],
    headers: &[&str],
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CoexError::io(path, e))?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(BUFFER_SIZE, file));
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| CoexError::io(path, e))?;
    Ok(())
}

pub fn prepare_output_dir(output_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    create_dir_all(output_dir).map_err(|e| CoexError::io(output_dir, e))?;
    Ok(output_dir.to_path_buf())
}

pub fn write_network_results(
    analysis: &NetworkAnalysis,
    prefix: &str,
    output_dir: impl AsRef<Path>,
) -> Result<()> {
    let output_dir = prepare_output_dir(output_dir)?;
    info!("Writing network results to: {}", output_dir.display());

    write_partition_file(&analysis.communities.partition, output_dir.join("partition.csv"))?;

    let graph = &analysis.communities.graph;
    let edges = graph.edges();
    let edge_rows: Vec<EdgeRow> = edges
        .iter()
        .map(|&(a, b, weight)| EdgeRow {
            source: graph.gene_name(a),
            target: graph.gene_name(b),
            weight,
        })
        .collect();
    write_table(&edge_rows, &EDGE_HEADERS, output_dir.join("network_edges.csv"))?;

    write_table(&analysis.top_genes, &CENTRALITY_HEADERS, output_dir.join("centrality.csv"))?;
    write_gmt_file(
        &analysis.gene_sets,
        output_dir.join(format!("{}_gene_sets.gmt", prefix)),
    )?;
    Ok(())
}

pub fn write_enrichment_results(
    analysis: &EnrichmentAnalysis,
    prefix: &str,
    output_dir: impl AsRef<Path>,
) -> Result<()> {
    let output_dir = prepare_output_dir(output_dir)?;
    info!("Writing enrichment results to: {}", output_dir.display());

    write_gmt_file(
        &analysis.gene_sets,
        output_dir.join(format!("{}_gene_sets.gmt", prefix)),
    )?;
    write_table(&analysis.scores.rows(), &SCORE_HEADERS, output_dir.join("enrichment_scores.csv"))?;
    write_table(&analysis.summaries, &SUMMARY_HEADERS, output_dir.join("enrichment_summary.csv"))?;

    let excluded_rows: Vec<ExcludedRow> = analysis
        .diagnostics
        .excluded_sets
        .iter()
        .map(|excluded| ExcludedRow {
            gene_set: &excluded.name,
            n_members: excluded.n_members,
            n_present: excluded.n_present,
            reason: excluded.reason.to_string(),
        })
        .collect();
    write_table(&excluded_rows, &EXCLUDED_HEADERS, output_dir.join("excluded_gene_sets.csv"))?;
    Ok(())
}

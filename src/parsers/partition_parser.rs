use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use lazy_static::lazy_static;
use log::{info, warn};
use rustc_hash::FxHashSet;
use serde::Serialize;
use crate::analysis::community_detection::{CommunityID, Partition};
use crate::parsers::expression_parser::normalize_gene_id;
use crate::utils::error::{CoexError, Result};

lazy_static! {
    static ref GENE_HEADERS: FxHashSet<&'static str> = {
        let mut headers = FxHashSet::default();
        for header in ["gene", "genes", "gene_id", "gene_symbol", "symbol", "id", "node"] {
            headers.insert(header);
        }
        headers
    };
}

lazy_static! {
    static ref COMMUNITY_HEADERS: FxHashSet<&'static str> = {
        let mut headers = FxHashSet::default();
        for header in ["community", "community_id", "partition", "module", "cluster"] {
            headers.insert(header);
        }
        headers
    };
}

#[derive(Debug, Serialize)]
struct PartitionRow<'a> {
    gene: &'a str,
    community: CommunityID,
}

fn find_column(
    headers: &StringRecord,
    accepted: &FxHashSet<&'static str>,
) -> Option<usize> {
    headers
        .iter()
        .position(|header| accepted.contains(header.trim().to_lowercase().as_str()))
}

pub fn read_partition(path: impl AsRef<Path>) -> Result<Partition> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CoexError::io(path, e))?;
    let delimiter = match path.extension().and_then(|s| s.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    };
    let partition = partition_from_reader(file, delimiter, &path.to_string_lossy())?;
    info!(
        "Read {} genes in {} communities from {}",
        partition.len(),
        partition.n_communities(),
        path.display()
    );
    Ok(partition)
}

pub fn partition_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    source_name: &str,
) -> Result<Partition> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let community_column = find_column(&headers, &COMMUNITY_HEADERS).ok_or_else(|| {
        CoexError::schema(
            source_name,
            format!(
                "no community column among headers [{}]",
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        )
    })?;
    let gene_column = find_column(&headers, &GENE_HEADERS).ok_or_else(|| {
        CoexError::schema(
            source_name,
            format!(
                "no gene identifier column among headers [{}]",
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        )
    })?;

    let mut partition = Partition::default();
    let mut duplicates = 0;
    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;
        let gene = normalize_gene_id(record.get(gene_column).unwrap_or(""));
        if gene.is_empty() {
            continue;
        }
        let raw_community = record.get(community_column).unwrap_or("").trim();
        let community = raw_community.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
            .map(|value| value as CommunityID)
            .ok_or_else(|| {
                CoexError::schema(
                    source_name,
                    format!("line {}: invalid community id '{}'", line + 2, raw_community),
                )
            })?;
        if partition.get(&gene).is_some() {
            duplicates += 1;
            continue;
        }
        partition.insert(gene, community);
    }

    if duplicates > 0 {
        warn!(
            "{} duplicate gene rows in {} were ignored, first assignment kept",
            duplicates, source_name
        );
    }
    Ok(partition)
}

pub const PARTITION_HEADERS: [&str; 2] = ["gene", "community"];

/// Writes `gene,community` rows sorted by community then gene. An empty
/// partition still gets its header line.
pub fn write_partition<W: Write>(partition: &Partition, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(PARTITION_HEADERS)?;
    for (gene, community) in partition.sorted_rows() {
        csv_writer.serialize(PartitionRow { gene, community })?;
    }
    csv_writer.flush().map_err(|e| CoexError::io("partition output", e))?;
    Ok(())
}

pub fn write_partition_file(partition: &Partition, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CoexError::io(path, e))?;
    write_partition(partition, file)
}

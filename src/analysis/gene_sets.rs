use std::collections::BTreeSet;
use log::info;
use crate::analysis::community_detection::{CommunityID, Partition};
use crate::parsers::expression_parser::{normalize_gene_id, ExpressionTable, GeneID};
use crate::utils::diagnostics::{ExcludedGeneSet, ExclusionReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSet {
    pub name: String,
    pub members: Vec<GeneID>,
}

impl GeneSet {
    /// Members are trimmed, de-duplicated and sorted; empty ids are dropped.
    pub fn new<I>(name: String, members: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let members: BTreeSet<GeneID> = members
            .into_iter()
            .map(|member| member.trim().to_string())
            .filter(|member| !member.is_empty())
            .collect();
        Self {
            name,
            members: members.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub fn gene_set_name(prefix: &str, community: CommunityID) -> String {
    format!("{}-{}", prefix, community + 1)
}

/// One gene set per community, in ascending community order.
pub fn gene_sets_from_partition(partition: &Partition, prefix: &str) -> Vec<GeneSet> {
    partition
        .communities()
        .into_iter()
        .map(|(community, members)| GeneSet::new(gene_set_name(prefix, community), members))
        .collect()
}

/// Gene set with its members resolved to rows of a target expression table.
#[derive(Debug, Clone)]
pub struct ResolvedGeneSet {
    pub name: String,
    pub n_members: usize,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneSetScreen {
    pub accepted: Vec<ResolvedGeneSet>,
    pub excluded: Vec<ExcludedGeneSet>,
    pub unknown_members: usize,
}

pub fn resolve_gene_sets(
    gene_sets: &[GeneSet],
    table: &ExpressionTable,
    min_set_size: usize,
) -> GeneSetScreen {
    let mut screen = GeneSetScreen::default();

    for gene_set in gene_sets {
        let rows: Vec<usize> = gene_set
            .members
            .iter()
            .filter_map(|member| table.gene_index(&normalize_gene_id(member)))
            .collect();
        screen.unknown_members += gene_set.len() - rows.len();

        let reason = if rows.is_empty() {
            Some(ExclusionReason::NoMembersInTarget)
        } else if rows.len() < min_set_size {
            Some(ExclusionReason::BelowMinimumSize {
                present: rows.len(),
                minimum: min_set_size,
            })
        } else {
            None
        };

        match reason {
            Some(reason) => screen.excluded.push(ExcludedGeneSet {
                name: gene_set.name.clone(),
                n_members: gene_set.len(),
                n_present: rows.len(),
                reason,
            }),
            None => screen.accepted.push(ResolvedGeneSet {
                name: gene_set.name.clone(),
                n_members: gene_set.len(),
                rows,
            }),
        }
    }

    info!(
        "{} of {} gene sets have enough members in the target table",
        screen.accepted.len(),
        gene_sets.len()
    );
    screen
}

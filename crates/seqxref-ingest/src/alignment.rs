//! Sequence alignment segments and overlap grouping
//!
//! An alignment maps a stretch of a structure entity's residue numbering onto
//! a reference sequence database record. Alignments that cover the same
//! entity region are grouped so a single representative can be chosen.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::warn;

/// Database name assigned to SIFTS-derived alignments
pub const SIFTS_DB_NAME: &str = "UNP";

/// Alignment record as delivered with structure entity data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdbAlignment {
    pub entity_seq_id_beg: Option<i64>,
    pub entity_seq_id_end: Option<i64>,
    pub entity_align_length: Option<i64>,
    pub db_seq_id_beg: Option<i64>,
    pub db_seq_id_end: Option<i64>,
    pub db_name: Option<String>,
    pub db_accession: Option<String>,
    pub db_isoform: Option<String>,
}

/// Alignment record in the compact SIFTS summary layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiftsAlignment {
    #[serde(rename = "UP")]
    pub accession: String,
    #[serde(rename = "BG")]
    pub entity_begin: i64,
    #[serde(rename = "LEN")]
    pub length: i64,
    #[serde(rename = "UBG")]
    pub db_begin: Option<i64>,
    #[serde(rename = "UND")]
    pub db_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceAlignment {
    entity_seq_id_beg: Option<i64>,
    entity_seq_id_end: Option<i64>,
    entity_align_length: Option<i64>,
    db_seq_id_beg: Option<i64>,
    db_seq_id_end: Option<i64>,
    db_name: Option<String>,
    db_accession: Option<String>,
    db_isoform: Option<String>,
}

impl SequenceAlignment {
    /// Build from a structure alignment record. Inverted entity bounds are
    /// dropped, leaving the alignment without an entity range.
    pub fn from_pdb(input: PdbAlignment) -> Self {
        let (entity_seq_id_beg, entity_seq_id_end) =
            match (input.entity_seq_id_beg, input.entity_seq_id_end) {
                (Some(beg), Some(end)) if end < beg => {
                    warn!(
                        accession = ?input.db_accession,
                        beg,
                        end,
                        "Alignment entity end precedes its beginning, ignoring bounds"
                    );
                    (None, None)
                },
                bounds => bounds,
            };
        Self {
            entity_seq_id_beg,
            entity_seq_id_end,
            entity_align_length: input.entity_align_length,
            db_seq_id_beg: input.db_seq_id_beg,
            db_seq_id_end: input.db_seq_id_end,
            db_name: input.db_name,
            db_accession: input.db_accession,
            db_isoform: input.db_isoform,
        }
    }

    pub fn from_sifts(input: SiftsAlignment) -> Self {
        Self {
            entity_seq_id_beg: Some(input.entity_begin),
            entity_seq_id_end: Some(input.entity_begin.saturating_add(input.length).saturating_sub(1)),
            entity_align_length: Some(input.length),
            db_seq_id_beg: input.db_begin,
            db_seq_id_end: input.db_end,
            db_name: Some(SIFTS_DB_NAME.to_string()),
            db_accession: Some(input.accession),
            db_isoform: None,
        }
    }

    /// Entity residues covered, as `beg..end + 1`
    pub fn entity_range(&self) -> Option<Range<i64>> {
        match (self.entity_seq_id_beg, self.entity_seq_id_end) {
            (Some(beg), Some(end)) => Some(beg..end.saturating_add(1)),
            _ => None,
        }
    }

    /// Explicit alignment length when one was supplied, else derived from the bounds
    pub fn entity_align_length(&self) -> Option<i64> {
        match self.entity_align_length {
            Some(length) if length != 0 => Some(length),
            _ => match (self.entity_seq_id_beg, self.entity_seq_id_end) {
                (Some(beg), Some(end)) => Some(end.saturating_sub(beg).saturating_add(1)),
                _ => None,
            },
        }
    }

    pub fn entity_seq_id_beg(&self) -> Option<i64> {
        self.entity_seq_id_beg
    }

    pub fn entity_seq_id_end(&self) -> Option<i64> {
        self.entity_seq_id_end
    }

    pub fn db_seq_id_beg(&self) -> Option<i64> {
        self.db_seq_id_beg
    }

    pub fn db_seq_id_end(&self) -> Option<i64> {
        self.db_seq_id_end
    }

    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    pub fn db_accession(&self) -> Option<&str> {
        self.db_accession.as_deref()
    }

    pub fn db_isoform(&self) -> Option<&str> {
        self.db_isoform.as_deref()
    }

    fn entity_span(&self) -> i64 {
        self.entity_range().map(|r| r.end.saturating_sub(r.start)).unwrap_or(0)
    }

    fn overlaps(&self, other: &SequenceAlignment) -> bool {
        match (self.entity_range(), other.entity_range()) {
            (Some(a), Some(b)) => ranges_overlap(&a, &b),
            _ => false,
        }
    }
}

impl std::fmt::Display for SequenceAlignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DB: {:?} ACC: {:?} ISOFORM: {:?} ENTITY BEG: {:?} DB BEG: {:?} LEN: {:?}",
            self.db_name,
            self.db_accession,
            self.db_isoform,
            self.entity_seq_id_beg,
            self.db_seq_id_beg,
            self.entity_align_length
        )
    }
}

/// True when both ranges are non-empty and share at least one position
pub fn ranges_overlap(a: &Range<i64>, b: &Range<i64>) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.start < b.end && a.end > b.start
}

/// Positions present in both ranges
pub fn range_intersection(a: &Range<i64>, b: &Range<i64>) -> BTreeSet<i64> {
    if !ranges_overlap(a, b) {
        return BTreeSet::new();
    }
    (a.start.max(b.start)..a.end.min(b.end)).collect()
}

/// Partition alignments into groups covering the same entity region.
///
/// Alignments are visited longest first (stable for equal lengths). Each one
/// joins the first group holding a member it overlaps, or opens a new group.
/// Group keys count up from 1. Alignments without an entity range never
/// overlap and always open their own group.
pub fn group_by_entity_overlap(
    alignments: &[SequenceAlignment],
) -> BTreeMap<usize, Vec<SequenceAlignment>> {
    let mut ordered: Vec<&SequenceAlignment> = alignments.iter().collect();
    ordered.sort_by(|a, b| b.entity_span().cmp(&a.entity_span()));

    let mut groups: BTreeMap<usize, Vec<SequenceAlignment>> = BTreeMap::new();
    for alignment in ordered {
        let home = groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| alignment.overlaps(m)))
            .map(|(key, _)| *key);
        let key = home.unwrap_or(groups.len() + 1);
        groups.entry(key).or_default().push(alignment.clone());
    }
    groups
}

/// Pick one representative alignment per overlapping region for every
/// `(db_name, db_accession)` pair: the member with the greatest alignment
/// length, earliest wins on ties.
pub fn longest_alignments(
    alignments: &[SequenceAlignment],
) -> BTreeMap<(String, String), Vec<SequenceAlignment>> {
    let mut by_reference: BTreeMap<(String, String), Vec<SequenceAlignment>> = BTreeMap::new();
    for alignment in alignments {
        let key = (
            alignment.db_name().unwrap_or_default().to_string(),
            alignment.db_accession().unwrap_or_default().to_string(),
        );
        by_reference.entry(key).or_default().push(alignment.clone());
    }

    by_reference
        .into_iter()
        .map(|(key, members)| {
            let representatives = group_by_entity_overlap(&members)
                .into_values()
                .filter_map(|group| {
                    let mut best: Option<SequenceAlignment> = None;
                    for candidate in group {
                        let longer = match &best {
                            None => true,
                            Some(current) => {
                                candidate.entity_align_length() > current.entity_align_length()
                            },
                        };
                        if longer {
                            best = Some(candidate);
                        }
                    }
                    best
                })
                .collect();
            (key, representatives)
        })
        .collect()
}

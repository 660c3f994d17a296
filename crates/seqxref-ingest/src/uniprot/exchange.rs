//! Exchange-format rendering of parsed UniProt entries
//!
//! [`reformat`] turns a [`ReferenceTable`] into the normalized records consumed
//! by downstream annotation loaders: identifier buckets, a protein summary and
//! a deduplicated feature list restricted to the recognized feature types.

use super::models::{EntryRecord, Feature, NameType, ReferenceTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// The only supported output format
pub const EXCHANGE_FORMAT: &str = "exchange";

/// Provenance used when no evidence key resolves
pub const DEFAULT_PROVENANCE: &str = "ECO:0000323";

pub const REFERENCE_SCHEME: &str = "UniProt";

/// Feature types kept in exchange records, normalized to upper snake case
pub const RECOGNIZED_FEATURE_TYPES: &[&str] = &[
    "ACTIVE_SITE",
    "BINDING_SITE",
    "CALCIUM_BINDING_REGION",
    "CHAIN",
    "COILED_COIL_REGION",
    "COMPOSITIONALLY_BIASED_REGION",
    "CROSS_LINK",
    "DISULFIDE_BOND",
    "DNA_BINDING_REGION",
    "DOMAIN",
    "GLYCOSYLATION_SITE",
    "HELIX",
    "INITIATOR_METHIONINE",
    "LIPID_MOIETY_BINDING_REGION",
    "METAL_ION_BINDING_SITE",
    "MODIFIED_RESIDUE",
    "MUTAGENESIS_SITE",
    "NON_CONSECUTIVE_RESIDUES",
    "NON_TERMINAL_RESIDUE",
    "NUCLEOTIDE_PHOSPHATE_BINDING_REGION",
    "PEPTIDE",
    "PROPEPTIDE",
    "REGION_OF_INTEREST",
    "REPEAT",
    "NON_STANDARD_AMINO_ACID",
    "SEQUENCE_CONFLICT",
    "SEQUENCE_VARIANT",
    "SHORT_SEQUENCE_MOTIF",
    "SIGNAL_PEPTIDE",
    "SITE",
    "SPLICE_VARIANT",
    "STRAND",
    "TOPOLOGICAL_DOMAIN",
    "TRANSIT_PEPTIDE",
    "TRANSMEMBRANE_REGION",
    "TURN",
    "UNSURE_RESIDUE",
    "ZINC_FINGER_REGION",
    "INTRAMEMBRANE_REGION",
];

// ============================================================================
// Output records
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub rcsb_id: String,
    pub rcsb_uniprot_container_identifiers: ContainerIdentifiers,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rcsb_uniprot_accession: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rcsb_uniprot_entry_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rcsb_uniprot_keyword: Vec<ExchangeKeyword>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcsb_uniprot_protein: Option<ExchangeProtein>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rcsb_uniprot_feature: Vec<ExchangeFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerIdentifiers {
    pub uniprot_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pfam_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub go_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ensembl_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeKeyword {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeProtein {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ProvenancedName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gene: Vec<ExchangeGene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ExchangeFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_organism: Option<SourceOrganism>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ec: Vec<EcNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenancedName {
    pub value: String,
    pub provenance_code: String,
}

/// All names of one `<gene>` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeGene {
    pub name: Vec<TypedGeneName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedGeneName {
    #[serde(rename = "type")]
    pub name_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFunction {
    pub details: String,
    pub provenance_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOrganism {
    pub scientific_name: String,
    pub taxonomy_id: i64,
    pub provenance_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcNumber {
    pub number: String,
    pub provenance_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub assignment_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance_code: Option<String>,
    pub reference_scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_ranges: Vec<FeatureRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_positions: Vec<FeaturePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRange {
    pub beg_seq_id: i64,
    pub end_seq_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeaturePosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_id: Option<String>,
    pub seq_id: i64,
}

// ============================================================================
// Reformatting
// ============================================================================

/// Render `reference` in `format_type`.
///
/// Only [`EXCHANGE_FORMAT`] is supported; any other format yields an empty map.
pub fn reformat(reference: &ReferenceTable, format_type: &str) -> BTreeMap<String, ExchangeRecord> {
    if format_type != EXCHANGE_FORMAT {
        warn!(format = format_type, "Unsupported reformat type");
        return BTreeMap::new();
    }

    let records: BTreeMap<String, ExchangeRecord> = reference
        .iter()
        .map(|(id, entry)| (id.clone(), exchange_record(id, entry)))
        .collect();
    debug!(records = records.len(), "Reformatted entries");
    records
}

fn exchange_record(id: &str, entry: &EntryRecord) -> ExchangeRecord {
    let mut identifiers = ContainerIdentifiers {
        uniprot_id: id.to_string(),
        ..Default::default()
    };
    let mut protein = ExchangeProtein {
        sequence: entry.sequence.clone(),
        name: entry
            .names
            .iter()
            .find(|n| n.name_type == NameType::Recommended)
            .map(|n| ProvenancedName {
                value: n.name.clone(),
                provenance_code: DEFAULT_PROVENANCE.to_string(),
            }),
        function: entry.comments_of("function").next().map(|c| ExchangeFunction {
            details: c.text.clone(),
            provenance_code: provenance(entry, c.evidence.as_deref()),
        }),
        ..Default::default()
    };

    if !entry.gene.is_empty() {
        protein.gene.push(ExchangeGene {
            name: entry
                .gene
                .iter()
                .map(|g| TypedGeneName {
                    name_type: normalize_type(g.name_type.as_deref().unwrap_or_default()),
                    value: g.name.clone(),
                })
                .collect(),
        });
    }

    if let (Some(scientific_name), Some(taxonomy_id)) = (&entry.source_scientific, entry.taxonomy_id) {
        protein.source_organism = Some(SourceOrganism {
            scientific_name: scientific_name.clone(),
            taxonomy_id,
            provenance_code: provenance(entry, entry.taxonomy_evc.as_deref()),
        });
    }

    let mut pfam = BTreeSet::new();
    let mut go = BTreeSet::new();
    let mut ensembl = BTreeSet::new();
    for reference in &entry.db_references {
        let id_code = reference.id_code.clone();
        match reference.resource.as_str() {
            "EC" => {
                if !protein.ec.iter().any(|ec| ec.number == id_code) {
                    protein.ec.push(EcNumber {
                        number: id_code,
                        provenance_code: provenance(entry, reference.property("evidence")),
                    });
                }
            },
            "Pfam" => {
                pfam.insert(id_code);
            },
            "GO" => {
                go.insert(id_code);
            },
            resource if resource.to_uppercase().starts_with("ENSEMB") => {
                ensembl.insert(id_code);
            },
            _ => {},
        }
    }
    identifiers.pfam_ids = pfam.into_iter().collect();
    identifiers.go_ids = go.into_iter().collect();
    identifiers.ensembl_ids = ensembl.into_iter().collect();

    ExchangeRecord {
        rcsb_id: id.to_string(),
        rcsb_uniprot_container_identifiers: identifiers,
        rcsb_uniprot_accession: entry.accessions.clone(),
        rcsb_uniprot_entry_name: entry.db_code.iter().cloned().collect(),
        rcsb_uniprot_keyword: entry
            .keywords
            .iter()
            .map(|k| ExchangeKeyword {
                id: k.id.clone(),
                value: k.keyword.clone(),
            })
            .collect(),
        rcsb_uniprot_protein: Some(protein),
        rcsb_uniprot_feature: exchange_features(entry),
    }
}

/// Identity of a raw feature for grouping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FeatureLabel<'a> {
    feature_type: String,
    description: Option<&'a str>,
    feature_id: Option<&'a str>,
    evidence: Option<&'a str>,
    reference: Option<&'a str>,
    original: Option<&'a str>,
    variation: Option<&'a str>,
}

impl<'a> FeatureLabel<'a> {
    fn of(feature: &'a Feature) -> Self {
        Self {
            feature_type: normalize_type(&feature.feature_type),
            description: feature.description.as_deref(),
            feature_id: feature.feature_id.as_deref(),
            evidence: feature.evidence.as_deref(),
            reference: feature.reference.as_deref(),
            original: feature.original.as_deref(),
            variation: feature.variation.as_deref(),
        }
    }
}

fn exchange_features(entry: &EntryRecord) -> Vec<ExchangeFeature> {
    // groups in first-appearance order
    let mut groups: Vec<(FeatureLabel<'_>, Vec<&Feature>)> = Vec::new();
    for feature in &entry.features {
        let label = FeatureLabel::of(feature);
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, members)) => members.push(feature),
            None => groups.push((label, vec![feature])),
        }
    }

    let assignment_version = format!(
        "{}_{}",
        entry.db_name.as_deref().unwrap_or_default(),
        entry.version.as_deref().unwrap_or_default()
    );

    let mut seen = HashSet::new();
    let mut features = Vec::new();
    for (label, members) in groups {
        if !RECOGNIZED_FEATURE_TYPES.contains(&label.feature_type.as_str()) {
            continue;
        }

        let mut description = label.description.unwrap_or_default().to_string();
        if let (Some(original), Some(variation)) = (label.original, label.variation) {
            description.push_str(&format!(" ({original} -> {variation})"));
        }

        let mut feature = ExchangeFeature {
            feature_type: label.feature_type.clone(),
            assignment_version: assignment_version.clone(),
            feature_id: label.feature_id.map(str::to_string),
            provenance_code: label.evidence.and_then(|keys| feature_provenance(entry, keys)),
            reference_scheme: REFERENCE_SCHEME.to_string(),
            description: (!description.is_empty()).then_some(description),
            feature_ranges: Vec::new(),
            feature_positions: Vec::new(),
        };
        for member in members {
            match (member.begin, member.end, member.position) {
                (Some(beg_seq_id), Some(end_seq_id), _) => feature.feature_ranges.push(FeatureRange {
                    beg_seq_id,
                    end_seq_id,
                }),
                (_, _, Some(seq_id)) => feature.feature_positions.push(FeaturePosition {
                    comp_id: label.original.map(str::to_string),
                    seq_id,
                }),
                _ => {},
            }
        }

        if seen.insert(feature.clone()) {
            features.push(feature);
        }
    }
    features
}

/// Resolve a single evidence key, falling back to [`DEFAULT_PROVENANCE`]
fn provenance(entry: &EntryRecord, key: Option<&str>) -> String {
    key.filter(|k| !k.is_empty())
        .and_then(|k| entry.evidence.get(k))
        .cloned()
        .unwrap_or_else(|| DEFAULT_PROVENANCE.to_string())
}

/// Comma-joined codes for space-separated evidence keys; `None` unless every
/// key resolves
fn feature_provenance(entry: &EntryRecord, keys: &str) -> Option<String> {
    let codes: Option<Vec<&str>> = keys
        .split_whitespace()
        .map(|k| entry.evidence.get(k).map(String::as_str))
        .collect();
    match codes {
        Some(codes) if !codes.is_empty() => Some(codes.join(",")),
        Some(_) => None,
        None => {
            warn!(keys, accession = ?entry.db_accession, "Unresolved feature evidence");
            None
        },
    }
}

fn normalize_type(raw: &str) -> String {
    raw.to_uppercase().replace(' ', "_")
}

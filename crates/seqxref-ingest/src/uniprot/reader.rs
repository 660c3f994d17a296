//! UniProt XML entry reader
//!
//! Converts a UniProt XML document (one or more `<entry>` elements) into a
//! [`ReferenceTable`] keyed by primary accession. Registered isoform codes
//! are materialized as additional records with rebuilt sequences.
//!
//! Each nesting level is handled by a table mapping a child tag to a handler.
//! Tags without a handler are ignored.

use super::error::Result;
use super::models::{
    Comment, DbReference, EntryRecord, Feature, GeneName, IsoformEdit, IsoformUpdate, Keyword,
    NameType, ProteinName, ReferenceTable,
};
use super::xml::{self, XmlElement};
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, error, warn};

/// Comment type that is never kept
const SKIPPED_COMMENT_TYPE: &str = "online information";

/// Cross-reference resources kept without their properties
const PLAIN_RESOURCES: &[&str] = &["EC", "PIR"];

/// Cross-reference resources kept with flattened properties
const PROPERTY_RESOURCES: &[&str] = &["EMBL", "GO", "RefSeq", "Pfam", "InterPro"];

const SPLICE_VARIANT: &str = "splice variant";
const DISPLAYED_ISOFORM: &str = "displayed";

// ============================================================================
// Variant registry
// ============================================================================

/// Isoform codes to materialize, keyed by variant code with the parent
/// accession as value (e.g. "P42284-3" -> "P42284")
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantRegistry {
    variants: BTreeMap<String, String>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variant code against its parent accession.
    ///
    /// Returns false when either identifier is blank.
    pub fn register_variant(&mut self, variant_id: &str, parent_id: &str) -> bool {
        let (variant_id, parent_id) = (variant_id.trim(), parent_id.trim());
        if variant_id.is_empty() || parent_id.is_empty() {
            return false;
        }
        self.variants
            .insert(variant_id.to_string(), parent_id.to_string());
        true
    }

    /// Variant codes registered for one parent, sorted
    pub fn variants_of(&self, parent_id: &str) -> Vec<&str> {
        self.variants
            .iter()
            .filter(|(_, parent)| parent.as_str() == parent_id)
            .map(|(variant, _)| variant.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Reader for UniProt XML documents
#[derive(Debug, Clone, Default)]
pub struct UniProtReader {
    /// Maximum number of entries to read per document (None for unlimited)
    limit: Option<usize>,
}

impl UniProtReader {
    pub fn new() -> Self {
        Self { limit: None }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    /// Parse a document, logging and returning an empty table on failure
    pub fn parse_document(&self, xml: &str, variants: &VariantRegistry) -> ReferenceTable {
        match self.try_parse_document(xml, variants) {
            Ok(table) => table,
            Err(e) => {
                error!(error = %e, "Failed to parse UniProt document");
                ReferenceTable::new()
            },
        }
    }

    /// Parse a document, surfacing well-formedness errors
    pub fn try_parse_document(
        &self,
        xml: &str,
        variants: &VariantRegistry,
    ) -> Result<ReferenceTable> {
        let root = xml::parse_document(xml)?;
        let entries: Vec<&XmlElement> = if root.name == "entry" {
            vec![&root]
        } else {
            root.children_named("entry").collect()
        };

        let mut table = ReferenceTable::new();
        for (index, entry) in entries.into_iter().enumerate() {
            if self.limit.is_some_and(|limit| index >= limit) {
                debug!(limit = index, "Entry limit reached");
                break;
            }

            let Some(record) = read_entry(entry) else {
                debug!(index, "Skipping entry without accession");
                continue;
            };
            let Some(accession) = record.db_accession.clone() else {
                continue;
            };

            if record.sequence.is_some() {
                for variant_id in variants.variants_of(&accession) {
                    match expand_isoform(entry, &record, variant_id) {
                        Some(isoform) => {
                            table.insert(variant_id.to_string(), isoform);
                        },
                        None => warn!(
                            isoform = variant_id,
                            accession = %accession,
                            "Isoform not declared in entry"
                        ),
                    }
                }
            }
            table.insert(accession, record);
        }

        debug!(records = table.len(), "Parsed UniProt document");
        Ok(table)
    }

    /// Parse a document from disk; `.gz` files are decompressed
    pub fn read_file(&self, path: &Path, variants: &VariantRegistry) -> Result<ReferenceTable> {
        let file = std::fs::File::open(path)?;
        let mut text = String::new();
        if path.extension().and_then(|s| s.to_str()) == Some("gz") {
            GzDecoder::new(file).read_to_string(&mut text)?;
        } else {
            std::io::BufReader::new(file).read_to_string(&mut text)?;
        }
        self.try_parse_document(&text, variants)
    }
}

// ============================================================================
// Tag dispatch
// ============================================================================

type Handler<T> = fn(&XmlElement, &mut T);

fn dispatch<T>(handlers: &[(&str, Handler<T>)], parent: &XmlElement, target: &mut T) {
    for child in &parent.children {
        if let Some((_, handler)) = handlers.iter().find(|(tag, _)| *tag == child.name) {
            handler(child, target);
        }
    }
}

const ENTRY_HANDLERS: &[(&str, Handler<EntryRecord>)] = &[
    ("name", read_entry_name),
    ("accession", read_accession),
    ("sequence", read_sequence),
    ("protein", read_protein),
    ("gene", read_gene),
    ("organism", read_organism),
    ("organismHost", read_organism_host),
    ("dbReference", read_db_reference),
    ("keyword", read_keyword),
    ("comment", read_comment),
    ("evidence", read_evidence),
    ("feature", read_feature),
];

const PROTEIN_HANDLERS: &[(&str, Handler<Vec<ProteinName>>)] = &[
    ("recommendedName", read_name_block),
    ("alternativeName", read_name_block),
    ("submittedName", read_name_block),
];

const ORGANISM_HANDLERS: &[(&str, Handler<Organism>)] = &[
    ("name", read_organism_name),
    ("dbReference", read_organism_taxonomy),
];

const FEATURE_HANDLERS: &[(&str, Handler<Feature>)] = &[
    ("location", read_feature_location),
    ("original", read_feature_original),
    ("variation", read_feature_variation),
];

const LOCATION_HANDLERS: &[(&str, Handler<Feature>)] = &[
    ("position", read_location_position),
    ("begin", read_location_begin),
    ("end", read_location_end),
];

fn read_entry(entry: &XmlElement) -> Option<EntryRecord> {
    let mut record = EntryRecord {
        db_name: entry.attr_string("dataset"),
        version: entry.attr_string("version"),
        modification_date: entry.attr_string("modified"),
        ..Default::default()
    };
    dispatch(ENTRY_HANDLERS, entry, &mut record);
    record.db_accession.is_some().then_some(record)
}

// ============================================================================
// Entry-level handlers
// ============================================================================

fn read_entry_name(el: &XmlElement, record: &mut EntryRecord) {
    if let Some(code) = el.text_value() {
        record.db_code = Some(code);
    }
}

fn read_accession(el: &XmlElement, record: &mut EntryRecord) {
    if let Some(accession) = el.text_value() {
        if record.db_accession.is_none() {
            record.db_accession = Some(accession.clone());
        }
        record.accessions.push(accession);
    }
}

fn read_sequence(el: &XmlElement, record: &mut EntryRecord) {
    record.sequence = el.joined_text();
}

fn read_protein(el: &XmlElement, record: &mut EntryRecord) {
    dispatch(PROTEIN_HANDLERS, el, &mut record.names);
}

fn read_name_block(el: &XmlElement, names: &mut Vec<ProteinName>) {
    let Some(name_type) = NameType::from_tag(&el.name) else {
        return;
    };
    let first = el.children.iter().find_map(|child| match child.name.as_str() {
        "fullName" => child.text_value().map(|name| (name, false)),
        "shortName" => child.text_value().map(|name| (name, true)),
        _ => None,
    });
    if let Some((name, is_abbrev)) = first {
        names.push(ProteinName {
            name,
            is_abbrev,
            name_type,
        });
    }
}

fn read_gene(el: &XmlElement, record: &mut EntryRecord) {
    for name in el.children_named("name") {
        if let Some(text) = name.text_value() {
            record.gene.push(GeneName {
                name: text,
                name_type: name.attr_string("type"),
            });
        }
    }
}

#[derive(Debug, Default)]
struct Organism {
    scientific: Option<String>,
    common: Option<String>,
    taxonomy_id: Option<i64>,
    evidence: Option<String>,
}

fn read_organism_name(el: &XmlElement, organism: &mut Organism) {
    match el.attr("type") {
        Some("scientific") => organism.scientific = el.text_value(),
        Some("common") => organism.common = el.text_value(),
        _ => {},
    }
}

fn read_organism_taxonomy(el: &XmlElement, organism: &mut Organism) {
    if el.attr("type") == Some("NCBI Taxonomy") {
        organism.taxonomy_id = el.attr_i64("id");
        organism.evidence = el.attr_string("key").or_else(|| el.attr_string("evidence"));
    }
}

fn read_organism_block(el: &XmlElement) -> Organism {
    let mut organism = Organism::default();
    dispatch(ORGANISM_HANDLERS, el, &mut organism);
    organism
}

fn read_organism(el: &XmlElement, record: &mut EntryRecord) {
    let organism = read_organism_block(el);
    record.source_scientific = organism.scientific;
    record.source_common = organism.common;
    record.taxonomy_id = organism.taxonomy_id;
    record.taxonomy_evc = organism.evidence;
}

fn read_organism_host(el: &XmlElement, record: &mut EntryRecord) {
    let host = read_organism_block(el);
    record.host_source_scientific = host.scientific;
    record.host_source_common = host.common;
    record.host_taxonomy_id = host.taxonomy_id;
    record.host_taxonomy_evc = host.evidence;
}

fn read_db_reference(el: &XmlElement, record: &mut EntryRecord) {
    let (Some(resource), Some(id_code)) = (el.attr_string("type"), el.attr_string("id")) else {
        return;
    };

    let keep_properties = PROPERTY_RESOURCES.contains(&resource.as_str())
        || resource.to_uppercase().starts_with("ENSEMBL");
    if !keep_properties && !PLAIN_RESOURCES.contains(&resource.as_str()) {
        return;
    }

    let mut properties = BTreeMap::new();
    if keep_properties {
        for property in el.children_named("property") {
            if let (Some(key), Some(value)) = (property.attr("type"), property.attr("value")) {
                properties.insert(key.to_string(), value.to_string());
            }
        }
    }
    record.db_references.push(DbReference {
        resource,
        id_code,
        properties,
    });
}

fn read_keyword(el: &XmlElement, record: &mut EntryRecord) {
    if let (Some(id), Some(keyword)) = (el.attr_string("id"), el.text_value()) {
        record.keywords.push(Keyword { id, keyword });
    }
}

fn read_comment(el: &XmlElement, record: &mut EntryRecord) {
    let Some(comment_type) = el.attr_string("type") else {
        return;
    };
    if comment_type == SKIPPED_COMMENT_TYPE {
        return;
    }
    let Some(text_el) = el.child("text") else {
        return;
    };
    if let Some(text) = text_el.text_value() {
        record.comments.push(Comment {
            comment_type,
            text,
            evidence: text_el.attr_string("evidence"),
        });
    }
}

fn read_evidence(el: &XmlElement, record: &mut EntryRecord) {
    if let (Some(key), Some(code)) = (el.attr_string("key"), el.attr_string("type")) {
        record.evidence.entry(key).or_insert(code);
    }
}

fn read_feature(el: &XmlElement, record: &mut EntryRecord) {
    let Some(feature_type) = el.attr_string("type") else {
        return;
    };
    let mut feature = Feature {
        feature_type,
        description: el.attr_string("description"),
        feature_id: el.attr_string("id"),
        reference: el.attr_string("ref"),
        evidence: el.attr_string("evidence"),
        ..Default::default()
    };
    dispatch(FEATURE_HANDLERS, el, &mut feature);
    record.features.push(feature);
}

// ============================================================================
// Feature-level handlers
// ============================================================================

fn read_feature_location(el: &XmlElement, feature: &mut Feature) {
    dispatch(LOCATION_HANDLERS, el, feature);
}

fn read_location_position(el: &XmlElement, feature: &mut Feature) {
    feature.position = el.attr_i64("position");
}

fn read_location_begin(el: &XmlElement, feature: &mut Feature) {
    feature.begin = el.attr_i64("position");
}

fn read_location_end(el: &XmlElement, feature: &mut Feature) {
    feature.end = el.attr_i64("position");
}

fn read_feature_original(el: &XmlElement, feature: &mut Feature) {
    feature.original = el.joined_text();
}

fn read_feature_variation(el: &XmlElement, feature: &mut Feature) {
    if feature.variation.is_none() {
        feature.variation = el.joined_text();
    }
}

// ============================================================================
// Isoforms
// ============================================================================

/// One splice-variant edit: replace residues `begin..=end` (1-based) with
/// `variation`, or delete them when there is no variation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceEdit {
    pub feature_id: String,
    pub begin: i64,
    pub end: i64,
    pub variation: Option<String>,
}

/// Apply splice edits listed in reference order, last edit first, so that
/// earlier offsets stay valid. Returns the edited sequence and the edits
/// that were applied.
pub fn apply_splice_edits(sequence: &str, edits: &[SpliceEdit]) -> (String, Vec<IsoformEdit>) {
    let mut residues = sequence.to_string();
    let mut applied = Vec::new();

    for edit in edits.iter().rev() {
        let len = residues.len();
        let start = usize::try_from(edit.begin.saturating_sub(1)).unwrap_or(0).min(len);
        let stop = usize::try_from(edit.end).unwrap_or(0).min(len).max(start);
        if !residues.is_char_boundary(start) || !residues.is_char_boundary(stop) {
            warn!(feature = %edit.feature_id, "Splice edit does not fall on residue boundaries");
            continue;
        }
        residues.replace_range(start..stop, edit.variation.as_deref().unwrap_or(""));
        applied.push(IsoformEdit {
            feature_id: edit.feature_id.clone(),
            begin: edit.begin,
            end: edit.end,
            variation: edit.variation.clone(),
        });
    }

    (residues, applied)
}

#[derive(Debug)]
struct IsoformDeclaration {
    names: Vec<String>,
    sequence_type: Option<String>,
    sequence_ref: Option<String>,
}

fn find_isoform(entry: &XmlElement, variant_id: &str) -> Option<IsoformDeclaration> {
    entry
        .descendants_named("isoform")
        .into_iter()
        .find(|iso| {
            iso.children_named("id")
                .any(|id| id.text_value().as_deref() == Some(variant_id))
        })
        .map(|iso| {
            let sequence = iso.child("sequence");
            IsoformDeclaration {
                names: iso.children_named("name").filter_map(XmlElement::text_value).collect(),
                sequence_type: sequence.and_then(|s| s.attr_string("type")),
                sequence_ref: sequence.and_then(|s| s.attr_string("ref")),
            }
        })
}

fn splice_variants(entry: &XmlElement) -> BTreeMap<String, SpliceEdit> {
    let mut table = BTreeMap::new();
    for feature in entry.children_named("feature") {
        if feature.attr("type") != Some(SPLICE_VARIANT) {
            continue;
        }
        let Some(feature_id) = feature.attr_string("id") else {
            continue;
        };
        let mut parsed = Feature::default();
        dispatch(FEATURE_HANDLERS, feature, &mut parsed);
        if let (Some(begin), Some(end)) = (parsed.begin, parsed.end) {
            table.insert(
                feature_id.clone(),
                SpliceEdit {
                    feature_id,
                    begin,
                    end,
                    variation: parsed.variation,
                },
            );
        }
    }
    table
}

/// Materialize a registered variant, or `None` when the entry does not
/// declare it
fn expand_isoform(entry: &XmlElement, base: &EntryRecord, variant_id: &str) -> Option<EntryRecord> {
    let declaration = find_isoform(entry, variant_id)?;
    let mut record = base.clone();
    let mut updated = false;

    record.isoform_names = declaration.names;
    let described = declaration.sequence_type.as_deref() != Some(DISPLAYED_ISOFORM);
    if let (true, Some(refs), Some(sequence)) =
        (described, declaration.sequence_ref, base.sequence.as_deref())
    {
        let available = splice_variants(entry);
        let edits: Vec<SpliceEdit> = refs
            .split_whitespace()
            .filter_map(|id| {
                let edit = available.get(id).cloned();
                if edit.is_none() {
                    debug!(isoform = variant_id, feature = id, "Splice feature not found");
                }
                edit
            })
            .collect();
        let (rebuilt, applied) = apply_splice_edits(sequence, &edits);
        if !applied.is_empty() {
            record.sequence = Some(rebuilt);
            record.isoform_edits = applied;
            updated = true;
        }
    }

    record.isoform_sequence_updated = Some(if updated {
        IsoformUpdate::Updated
    } else {
        IsoformUpdate::Unchanged
    });
    record.db_isoform = Some(variant_id.to_string());
    Some(record)
}

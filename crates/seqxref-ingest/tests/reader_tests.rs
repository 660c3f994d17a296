//! UniProt XML reader tests against a multi-entry fixture document

use seqxref_ingest::uniprot::models::{IsoformUpdate, NameType};
use seqxref_ingest::uniprot::{ReferenceTable, UniProtReader, VariantRegistry};
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("uniprot")
}

fn read_fixture(variants: &VariantRegistry) -> ReferenceTable {
    UniProtReader::new()
        .read_file(&fixture_path().join("entries.xml"), variants)
        .expect("Failed to parse fixture document")
}

fn isoform_registry() -> VariantRegistry {
    let mut variants = VariantRegistry::new();
    assert!(variants.register_variant("P88888-2", "P88888"));
    variants
}

// ============================================================================
// Entry fields
// ============================================================================

#[test]
fn test_entry_identity_and_sequence() {
    let table = read_fixture(&VariantRegistry::new());
    let entry = &table["P99999"];

    assert_eq!(entry.db_code.as_deref(), Some("CYC_HUMAN"));
    assert_eq!(entry.db_name.as_deref(), Some("Swiss-Prot"));
    assert_eq!(entry.version.as_deref(), Some("201"));
    assert_eq!(entry.modification_date.as_deref(), Some("2024-01-24"));
    assert_eq!(entry.accessions, vec!["P99999", "B2R5N8", "Q6NUR2"]);

    let sequence = entry.sequence.as_deref().unwrap();
    assert_eq!(sequence.len(), 105);
    assert!(!sequence.contains('\n'));
    assert!(sequence.starts_with("MGDVEKGKK"));
}

#[test]
fn test_names_genes_and_organism() {
    let table = read_fixture(&VariantRegistry::new());
    let entry = &table["P99999"];

    assert_eq!(entry.names.len(), 2);
    assert_eq!(entry.names[0].name, "Cytochrome c");
    assert_eq!(entry.names[0].name_type, NameType::Recommended);
    assert!(!entry.names[0].is_abbrev);
    // first name element of the block wins
    assert_eq!(entry.names[1].name, "Cyt c");
    assert!(entry.names[1].is_abbrev);

    let genes: Vec<(&str, Option<&str>)> = entry
        .gene
        .iter()
        .map(|g| (g.name.as_str(), g.name_type.as_deref()))
        .collect();
    assert_eq!(genes, vec![("CYCS", Some("primary")), ("CYC", Some("synonym"))]);

    assert_eq!(entry.source_scientific.as_deref(), Some("Homo sapiens"));
    assert_eq!(entry.source_common.as_deref(), Some("Human"));
    assert_eq!(entry.taxonomy_id, Some(9606));
    assert_eq!(entry.taxonomy_evc.as_deref(), Some("1"));
}

#[test]
fn test_comments_skip_online_information() {
    let table = read_fixture(&VariantRegistry::new());
    let entry = &table["P99999"];

    assert_eq!(entry.comments.len(), 1);
    assert_eq!(entry.comments[0].comment_type, "function");
    assert_eq!(entry.comments[0].text, "Electron carrier protein.");
    assert_eq!(entry.comments[0].evidence.as_deref(), Some("2"));
    assert!(entry.comments.iter().all(|c| c.comment_type != "online information"));
}

#[test]
fn test_db_references() {
    let table = read_fixture(&VariantRegistry::new());
    let entry = &table["P99999"];

    let resources: Vec<&str> = entry.db_references.iter().map(|r| r.resource.as_str()).collect();
    assert_eq!(resources, vec!["EC", "PIR", "Pfam", "GO", "Ensembl"]);

    let ec = entry.references_to("EC").next().unwrap();
    assert_eq!(ec.id_code, "7.1.1.9");
    assert!(ec.properties.is_empty());

    let pfam = entry.references_to("Pfam").next().unwrap();
    assert_eq!(pfam.property("entry name"), Some("Cytochrom_C"));
    assert_eq!(pfam.property("match status"), Some("1"));

    let ensembl = entry.references_to("Ensembl").next().unwrap();
    assert_eq!(ensembl.property("gene ID"), Some("ENSG00000172115"));
}

#[test]
fn test_keywords_evidence_and_features() {
    let table = read_fixture(&VariantRegistry::new());
    let entry = &table["P99999"];

    assert_eq!(entry.keywords.len(), 2);
    assert_eq!(entry.keywords[0].id, "KW-0349");
    assert_eq!(entry.keywords[0].keyword, "Heme");

    assert_eq!(entry.evidence.get("1").map(String::as_str), Some("ECO:0000269"));
    assert_eq!(entry.evidence.get("2").map(String::as_str), Some("ECO:0000305"));

    let chain = &entry.features[0];
    assert_eq!(chain.feature_type, "chain");
    assert_eq!(chain.feature_id.as_deref(), Some("PRO_0000108218"));
    assert_eq!((chain.begin, chain.end), (Some(2), Some(105)));
    assert_eq!(chain.position, None);

    let site = &entry.features[1];
    assert_eq!(site.position, Some(15));
    assert_eq!(site.evidence.as_deref(), Some("2"));
}

#[test]
fn test_entry_without_accession_is_dropped() {
    let table = read_fixture(&VariantRegistry::new());
    assert_eq!(table.len(), 2);
    assert!(table.values().all(|e| e.db_code.as_deref() != Some("NOACC_HUMAN")));
}

// ============================================================================
// Isoforms
// ============================================================================

#[test]
fn test_registered_isoform_is_materialized() {
    let table = read_fixture(&isoform_registry());

    assert!(table.contains_key("P99999"));
    assert!(table.contains_key("P88888"));
    assert!(table.contains_key("P88888-2"));

    let base = &table["P88888"];
    assert_eq!(base.sequence.as_deref(), Some("ABCDEFGHIJKLMNOPQRSTUVWXYZABCD"));
    assert_eq!(base.db_isoform, None);

    let isoform = &table["P88888-2"];
    // VSP_000002 (20-22) applied before VSP_000001 (10-12)
    assert_eq!(isoform.sequence.as_deref(), Some("ABCDEFGHIZMNOPQRSWXYZABCD"));
    assert_eq!(isoform.isoform_sequence_updated, Some(IsoformUpdate::Updated));
    assert_eq!(isoform.db_isoform.as_deref(), Some("P88888-2"));
    assert_eq!(isoform.isoform_names, vec!["Short", "Delta"]);

    let applied: Vec<&str> = isoform.isoform_edits.iter().map(|e| e.feature_id.as_str()).collect();
    assert_eq!(applied, vec!["VSP_000002", "VSP_000001"]);
    assert_eq!(isoform.isoform_edits[1].variation.as_deref(), Some("Z"));
}

#[test]
fn test_displayed_isoform_keeps_sequence() {
    let mut variants = VariantRegistry::new();
    variants.register_variant("P88888-1", "P88888");
    let table = read_fixture(&variants);

    let isoform = &table["P88888-1"];
    assert_eq!(isoform.sequence, table["P88888"].sequence);
    assert_eq!(isoform.isoform_sequence_updated, Some(IsoformUpdate::Unchanged));
    assert_eq!(isoform.isoform_names, vec!["Long"]);
    assert!(isoform.isoform_edits.is_empty());
}

#[test]
fn test_unregistered_isoforms_are_not_emitted() {
    let table = read_fixture(&VariantRegistry::new());
    assert!(!table.contains_key("P88888-1"));
    assert!(!table.contains_key("P88888-2"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_malformed_document_yields_empty_table() {
    let reader = UniProtReader::new();
    let table = reader.parse_document("<uniprot><entry><accession>P1</accession>", &VariantRegistry::new());
    assert!(table.is_empty());
    assert!(reader
        .try_parse_document("not xml at all", &VariantRegistry::new())
        .is_err());
}

#[test]
fn test_entry_limit() {
    let table = UniProtReader::with_limit(1)
        .read_file(&fixture_path().join("entries.xml"), &VariantRegistry::new())
        .unwrap();
    assert_eq!(table.keys().collect::<Vec<_>>(), vec!["P99999"]);
}

//! Exchange-format rendering of parsed fixture entries

use seqxref_ingest::uniprot::exchange::{DEFAULT_PROVENANCE, REFERENCE_SCHEME};
use seqxref_ingest::uniprot::{reformat, UniProtReader, VariantRegistry, EXCHANGE_FORMAT};
use std::path::PathBuf;

fn fixture_records() -> seqxref_ingest::uniprot::ReferenceTable {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("uniprot")
        .join("entries.xml");
    let mut variants = VariantRegistry::new();
    variants.register_variant("P88888-2", "P88888");
    UniProtReader::new().read_file(&path, &variants).unwrap()
}

#[test]
fn test_identifiers_and_protein() {
    let records = reformat(&fixture_records(), EXCHANGE_FORMAT);
    assert_eq!(records.len(), 3);

    let cyc = &records["P99999"];
    let ids = &cyc.rcsb_uniprot_container_identifiers;
    assert_eq!(ids.uniprot_id, "P99999");
    assert_eq!(ids.pfam_ids, vec!["PF00034"]);
    assert_eq!(ids.go_ids, vec!["GO:0005758"]);
    assert_eq!(ids.ensembl_ids, vec!["ENST00000305786"]);
    assert_eq!(cyc.rcsb_uniprot_entry_name, vec!["CYC_HUMAN"]);

    let protein = cyc.rcsb_uniprot_protein.as_ref().unwrap();
    assert_eq!(protein.name.as_ref().unwrap().value, "Cytochrome c");
    assert_eq!(protein.ec.len(), 1);
    assert_eq!(protein.ec[0].number, "7.1.1.9");
    assert_eq!(protein.ec[0].provenance_code, DEFAULT_PROVENANCE);

    let function = protein.function.as_ref().unwrap();
    assert_eq!(function.details, "Electron carrier protein.");
    assert_eq!(function.provenance_code, "ECO:0000305");

    let organism = protein.source_organism.as_ref().unwrap();
    assert_eq!(organism.scientific_name, "Homo sapiens");
    assert_eq!(organism.provenance_code, "ECO:0000269");
}

#[test]
fn test_features() {
    let records = reformat(&fixture_records(), EXCHANGE_FORMAT);
    let features = &records["P99999"].rcsb_uniprot_feature;
    assert_eq!(features.len(), 2);

    let chain = &features[0];
    assert_eq!(chain.feature_type, "CHAIN");
    assert_eq!(chain.assignment_version, "Swiss-Prot_201");
    assert_eq!(chain.reference_scheme, REFERENCE_SCHEME);
    assert_eq!(chain.provenance_code, None);
    assert_eq!(chain.feature_ranges[0].beg_seq_id, 2);
    assert_eq!(chain.feature_ranges[0].end_seq_id, 105);

    let site = &features[1];
    assert_eq!(site.feature_type, "BINDING_SITE");
    assert_eq!(site.provenance_code.as_deref(), Some("ECO:0000305"));
    assert_eq!(site.feature_positions[0].seq_id, 15);
    assert_eq!(site.feature_positions[0].comp_id, None);

    let splices = &records["P88888-2"].rcsb_uniprot_feature;
    assert_eq!(splices.len(), 2);
    assert_eq!(splices[0].description.as_deref(), Some("In isoform Short. (JKL -> Z)"));
    assert_eq!(splices[1].description.as_deref(), Some("In isoform Short."));
}

#[test]
fn test_serialized_shape() {
    let records = reformat(&fixture_records(), EXCHANGE_FORMAT);
    let value = serde_json::to_value(&records["P99999"]).unwrap();

    assert_eq!(value["rcsb_id"], "P99999");
    assert_eq!(value["rcsb_uniprot_keyword"][0]["value"], "Heme");
    assert_eq!(value["rcsb_uniprot_protein"]["gene"][0]["name"][0]["type"], "PRIMARY");
    assert_eq!(value["rcsb_uniprot_feature"][0]["type"], "CHAIN");
    assert!(value["rcsb_uniprot_feature"][1].get("feature_ranges").is_none());
    assert!(value["rcsb_uniprot_feature"][1]["feature_positions"][0].get("comp_id").is_none());
}

#[test]
fn test_other_formats_are_empty() {
    assert!(reformat(&fixture_records(), "core").is_empty());
}

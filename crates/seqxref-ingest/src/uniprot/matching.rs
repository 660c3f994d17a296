//! Correlating requested identifiers with fetched entries

use super::models::{MatchIndex, MatchKind, MatchResult, MatchedTaxon, ReferenceTable};
use std::collections::{BTreeMap, BTreeSet};

/// Search id for an input id: everything before the first `-`
pub fn search_id(input_id: &str) -> &str {
    input_id
        .split_once('-')
        .map_or(input_id, |(base, _)| base)
}

/// Build the match index for `id_list` against an existing reference table.
///
/// Each input is looked up by its search id: a direct key of the table is a
/// primary match; otherwise any record listing the search id among its
/// accessions is a secondary match. Pure function of its inputs.
pub fn rebuild_match_result_index(id_list: &[String], reference: &ReferenceTable) -> MatchIndex {
    let secondary = secondary_index(reference);
    let mut index = MatchIndex::new();

    for input_id in id_list {
        let search = search_id(input_id);
        let mut matched_ids = BTreeMap::new();

        let matched = if let Some(record) = reference.get(search) {
            matched_ids.insert(
                search.to_string(),
                MatchedTaxon {
                    tax_id: record.taxonomy_id,
                },
            );
            MatchKind::Primary
        } else if let Some(primaries) = secondary.get(search) {
            for primary in primaries {
                let tax_id = reference.get(primary.as_str()).and_then(|r| r.taxonomy_id);
                matched_ids.insert(primary.clone(), MatchedTaxon { tax_id });
            }
            MatchKind::Secondary
        } else {
            MatchKind::Unmatched
        };

        index.insert(MatchResult {
            input_id: input_id.clone(),
            search_id: search.to_string(),
            matched,
            matched_ids,
        });
    }
    index
}

/// accession -> primary accessions of every record that lists it
fn secondary_index(reference: &ReferenceTable) -> BTreeMap<&str, BTreeSet<String>> {
    let mut index: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for (key, record) in reference {
        let primary = record.db_accession.clone().unwrap_or_else(|| key.clone());
        for accession in &record.accessions {
            index.entry(accession.as_str()).or_default().insert(primary.clone());
        }
    }
    index
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::uniprot::models::EntryRecord;

    fn record(accessions: &[&str], tax_id: i64) -> EntryRecord {
        EntryRecord {
            db_accession: accessions.first().map(|s| s.to_string()),
            accessions: accessions.iter().map(|s| s.to_string()).collect(),
            taxonomy_id: Some(tax_id),
            ..Default::default()
        }
    }

    fn table() -> ReferenceTable {
        let mut table = ReferenceTable::new();
        table.insert("P69905".to_string(), record(&["P69905", "P01922", "Q3MIF5"], 9606));
        table.insert("P68871".to_string(), record(&["P68871", "A4GX73"], 9606));
        table
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_search_id_strips_variant_suffix() {
        assert_eq!(search_id("P69905-2"), "P69905");
        assert_eq!(search_id("P69905"), "P69905");
        assert_eq!(search_id("P69905-2-1"), "P69905");
    }

    #[test]
    fn test_primary_secondary_and_unmatched() {
        let index = rebuild_match_result_index(&ids(&["P69905-2", "P01922", "Q00000"]), &table());

        let primary = index.get("P69905-2").unwrap();
        assert_eq!(primary.matched, MatchKind::Primary);
        assert_eq!(primary.search_id, "P69905");
        assert_eq!(primary.matched_ids["P69905"].tax_id, Some(9606));

        let secondary = index.get("P01922").unwrap();
        assert_eq!(secondary.matched, MatchKind::Secondary);
        assert!(secondary.matched_ids.contains_key("P69905"));

        assert_eq!(index.get("Q00000").unwrap().matched, MatchKind::Unmatched);
        assert_eq!(index.unmatched(), vec!["Q00000"]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let input = ids(&["P69905", "A4GX73", "P69905", "X1"]);
        let reference = table();
        let first = rebuild_match_result_index(&input, &reference);
        let second = rebuild_match_result_index(&input, &reference);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(rebuild_match_result_index(&[], &ReferenceTable::new()).is_empty());
        let index = rebuild_match_result_index(&ids(&["P1"]), &ReferenceTable::new());
        assert_eq!(index.get("P1").unwrap().matched, MatchKind::Unmatched);
    }

    #[test]
    fn test_large_id_list() {
        let input: Vec<String> = (0..50_000).map(|i| format!("Q{i:05}")).collect();
        let started = std::time::Instant::now();
        let index = rebuild_match_result_index(&input, &table());

        assert_eq!(index.len(), input.len());
        assert_eq!(index.get("Q49999").unwrap().matched, MatchKind::Unmatched);
        assert_eq!(index.iter().next().unwrap().input_id, "Q00000");
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}

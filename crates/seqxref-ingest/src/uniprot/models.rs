//! UniProt data models

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Parsed entries keyed by primary accession or isoform code
pub type ReferenceTable = BTreeMap<String, EntryRecord>;

/// One parsed UniProt entry, or an isoform derived from one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryRecord {
    // === Entry attributes ===
    /// Source dataset (e.g., "Swiss-Prot")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,

    // === Identity ===
    /// Entry name (e.g., "HBA_HUMAN")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_code: Option<String>,
    /// Primary accession, always the first of `accessions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_accession: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Keyword>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<ProteinName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gene: Vec<GeneName>,

    // === Organism ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_scientific: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_common: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy_id: Option<i64>,
    /// Evidence key attached to the taxonomy reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy_evc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_source_scientific: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_source_common: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_taxonomy_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_taxonomy_evc: Option<String>,

    // === Annotation ===
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(rename = "dbReferences", skip_serializing_if = "Vec::is_empty")]
    pub db_references: Vec<DbReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    /// Evidence key -> evidence code (e.g., "1" -> "ECO:0000269")
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub evidence: BTreeMap<String, String>,

    // === Isoform fields, set only on variant records ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_isoform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isoform_sequence_updated: Option<IsoformUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub isoform_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub isoform_edits: Vec<IsoformEdit>,
}

impl EntryRecord {
    /// Cross-references to one resource, in document order
    pub fn references_to<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a DbReference> {
        self.db_references.iter().filter(move |r| r.resource == resource)
    }

    /// Comments of one type, in document order
    pub fn comments_of<'a>(&'a self, comment_type: &'a str) -> impl Iterator<Item = &'a Comment> {
        self.comments.iter().filter(move |c| c.comment_type == comment_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub keyword: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameType {
    #[serde(rename = "recommendedName")]
    Recommended,
    #[serde(rename = "alternativeName")]
    Alternative,
    #[serde(rename = "submittedName")]
    Submitted,
}

impl NameType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "recommendedName" => Some(NameType::Recommended),
            "alternativeName" => Some(NameType::Alternative),
            "submittedName" => Some(NameType::Submitted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinName {
    pub name: String,
    /// True when taken from a `shortName`
    #[serde(rename = "isAbbrev")]
    pub is_abbrev: bool,
    #[serde(rename = "nameType")]
    pub name_type: NameType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneName {
    pub name: String,
    /// e.g. "primary", "synonym", "ORF"
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub name_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "type")]
    pub comment_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Cross-reference; nested `<property>` values are flattened alongside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbReference {
    pub resource: String,
    pub id_code: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, String>,
}

impl DbReference {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Space-separated evidence keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

/// Whether an isoform sequence differs from the displayed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsoformUpdate {
    #[serde(rename = "Y")]
    Updated,
    #[serde(rename = "N")]
    Unchanged,
}

/// A splice edit applied while rebuilding an isoform sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoformEdit {
    pub feature_id: String,
    pub begin: i64,
    pub end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

// ============================================================================
// Match index
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Search id is a key of the reference table
    Primary,
    /// Search id is a secondary accession of some record
    Secondary,
    #[serde(rename = "none")]
    Unmatched,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTaxon {
    #[serde(rename = "taxId")]
    pub tax_id: Option<i64>,
}

/// How one requested identifier resolved against the reference table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "inputId")]
    pub input_id: String,
    #[serde(rename = "searchId")]
    pub search_id: String,
    pub matched: MatchKind,
    #[serde(rename = "matchedIds")]
    pub matched_ids: BTreeMap<String, MatchedTaxon>,
}

/// Match results in input order, one per distinct input identifier.
///
/// Serialized as the plain list of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MatchResult>", into = "Vec<MatchResult>")]
pub struct MatchIndex {
    results: Vec<MatchResult>,
    positions: HashMap<String, usize>,
}

impl MatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result unless the input id is already indexed
    pub fn insert(&mut self, result: MatchResult) -> bool {
        if self.positions.contains_key(&result.input_id) {
            return false;
        }
        self.positions
            .insert(result.input_id.clone(), self.results.len());
        self.results.push(result);
        true
    }

    pub fn get(&self, input_id: &str) -> Option<&MatchResult> {
        self.positions
            .get(input_id)
            .and_then(|&i| self.results.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Input ids that did not resolve
    pub fn unmatched(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.matched == MatchKind::Unmatched)
            .map(|r| r.input_id.as_str())
            .collect()
    }
}

impl From<Vec<MatchResult>> for MatchIndex {
    fn from(results: Vec<MatchResult>) -> Self {
        let mut index = Self::new();
        for result in results {
            index.insert(result);
        }
        index
    }
}

impl From<MatchIndex> for Vec<MatchResult> {
    fn from(index: MatchIndex) -> Self {
        index.results
    }
}

// ============================================================================
// Sequence-only records
// ============================================================================

/// A record parsed from a UniProt FASTA response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// "sp" or "tr" for UniProt headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    pub db_accession: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_scientific: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_existence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_version: Option<u32>,
    pub sequence: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_reference_properties_flatten() {
        let mut properties = BTreeMap::new();
        properties.insert("entry name".to_string(), "Globin".to_string());
        let reference = DbReference {
            resource: "Pfam".to_string(),
            id_code: "PF00042".to_string(),
            properties,
        };
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            json!({"resource": "Pfam", "id_code": "PF00042", "entry name": "Globin"})
        );
    }

    #[test]
    fn test_match_index_keeps_first_result_per_input() {
        let mut index = MatchIndex::new();
        let result = MatchResult {
            input_id: "P1".to_string(),
            search_id: "P1".to_string(),
            matched: MatchKind::Unmatched,
            matched_ids: BTreeMap::new(),
        };
        assert!(index.insert(result.clone()));
        assert!(!index.insert(result));
        assert_eq!(index.len(), 1);
        assert_eq!(index.unmatched(), vec!["P1"]);
        assert_eq!(serde_json::to_value(&index).unwrap()[0]["matched"], "none");
    }

    #[test]
    fn test_match_index_lookup_survives_json() {
        let results: Vec<MatchResult> = ["P1", "P2", "P1"]
            .iter()
            .map(|id| MatchResult {
                input_id: id.to_string(),
                search_id: id.to_string(),
                matched: MatchKind::Primary,
                matched_ids: BTreeMap::new(),
            })
            .collect();
        let index = MatchIndex::from(results);
        assert_eq!(index.len(), 2);

        let text = serde_json::to_string(&index).unwrap();
        let restored: MatchIndex = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, index);
        assert_eq!(restored.get("P2").unwrap().input_id, "P2");
        assert!(restored.get("P3").is_none());
    }

    #[test]
    fn test_isoform_update_serializes_as_flag() {
        assert_eq!(serde_json::to_value(IsoformUpdate::Updated).unwrap(), json!("Y"));
        assert_eq!(serde_json::to_value(IsoformUpdate::Unchanged).unwrap(), json!("N"));
    }
}

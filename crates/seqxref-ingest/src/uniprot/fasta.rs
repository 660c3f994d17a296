//! FASTA responses for sequence-only lookups

use super::error::{Result, UniProtError};
use super::models::SequenceRecord;
use regex::Regex;

const UNIPROT_HEADER: &str = r"^(?P<db>sp|tr)\|(?P<accession>[^|]+)\|(?P<code>\S+)\s+(?P<description>.*?)\s+OS=(?P<organism>.+?)\s+OX=(?P<taxon>\d+)(?:\s+GN=(?P<gene>\S+))?(?:\s+PE=(?P<pe>\d))?(?:\s+SV=(?P<sv>\d+))?\s*$";

/// Parse a single-record FASTA response
pub fn parse_fasta_record(text: &str) -> Result<SequenceRecord> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let header = lines
        .next()
        .and_then(|line| line.strip_prefix('>'))
        .ok_or_else(|| UniProtError::malformed_response("sequence", "missing FASTA header"))?;

    let sequence: String = lines
        .take_while(|line| !line.starts_with('>'))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if sequence.is_empty() || !sequence.chars().all(|c| c.is_ascii_alphabetic() || c == '*') {
        return Err(UniProtError::malformed_response(
            "sequence",
            format!("invalid residues for '{header}'"),
        ));
    }

    let mut record = parse_header(header)?;
    record.sequence = sequence;
    Ok(record)
}

fn parse_header(header: &str) -> Result<SequenceRecord> {
    let pattern = Regex::new(UNIPROT_HEADER)?;
    let Some(caps) = pattern.captures(header) else {
        let accession = header.split_whitespace().next().unwrap_or_default();
        if accession.is_empty() {
            return Err(UniProtError::malformed_response("sequence", "empty FASTA header"));
        }
        return Ok(SequenceRecord {
            db_accession: accession.to_string(),
            description: header
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim().to_string()),
            ..Default::default()
        });
    };

    let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    Ok(SequenceRecord {
        db_name: text("db"),
        db_accession: text("accession").unwrap_or_default(),
        db_code: text("code"),
        description: text("description").filter(|d| !d.is_empty()),
        org_scientific: text("organism"),
        taxonomy_id: text("taxon").and_then(|t| t.parse().ok()),
        gene_name: text("gene"),
        protein_existence: text("pe").and_then(|v| v.parse().ok()),
        sequence_version: text("sv").and_then(|v| v.parse().ok()),
        sequence: String::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uniprot_fasta() {
        let text = ">sp|P69905|HBA_HUMAN Hemoglobin subunit alpha OS=Homo sapiens OX=9606 GN=HBA1 PE=1 SV=2\n\
                    MVLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSFPTTKTYFPHFDLSHGSAQVKGHGKKVADAL\n\
                    TNAVAHVDDMPNALSALSDLHAHKLRVDPVNFKLLSHCLLVTLAAHLPAEFTPAVHASLDKFLASVSTVLTSKYR\n";
        let record = parse_fasta_record(text).unwrap();

        assert_eq!(record.db_name.as_deref(), Some("sp"));
        assert_eq!(record.db_accession, "P69905");
        assert_eq!(record.db_code.as_deref(), Some("HBA_HUMAN"));
        assert_eq!(record.description.as_deref(), Some("Hemoglobin subunit alpha"));
        assert_eq!(record.org_scientific.as_deref(), Some("Homo sapiens"));
        assert_eq!(record.taxonomy_id, Some(9606));
        assert_eq!(record.gene_name.as_deref(), Some("HBA1"));
        assert_eq!(record.protein_existence, Some(1));
        assert_eq!(record.sequence_version, Some(2));
        assert_eq!(record.sequence.len(), 142);
        assert!(record.sequence.starts_with("MVLSPADK"));
    }

    #[test]
    fn test_header_without_gene_name() {
        let text = ">tr|A0A024R161|A0A024R161_HUMAN Guanine nucleotide-binding protein OS=Homo sapiens OX=9606 PE=3 SV=1\nmkvl\n";
        let record = parse_fasta_record(text).unwrap();
        assert_eq!(record.db_name.as_deref(), Some("tr"));
        assert_eq!(record.gene_name, None);
        assert_eq!(record.sequence, "MKVL");
    }

    #[test]
    fn test_non_uniprot_header_keeps_first_token() {
        let record = parse_fasta_record(">seq1 some protein\nACDE\n").unwrap();
        assert_eq!(record.db_accession, "seq1");
        assert_eq!(record.description.as_deref(), Some("some protein"));
        assert_eq!(record.db_name, None);
    }

    #[test]
    fn test_rejects_missing_header_or_residues() {
        assert!(parse_fasta_record("MKVL\n").is_err());
        assert!(parse_fasta_record(">sp|P1|X_HUMAN d OS=H OX=1\n").is_err());
        assert!(parse_fasta_record(">sp|P1|X_HUMAN d OS=H OX=1\nMK-VL\n").is_err());
    }
}

//! Batch retrieval of UniProt entries
//!
//! `UniProtFetcher::fetch_list` resolves a list of accessions (optionally
//! isoform-suffixed, e.g. `P42284-3`) into a [`ReferenceTable`] and a
//! [`MatchIndex`]. Identifiers are fetched in fixed-size chunks, one request
//! at a time. Per chunk:
//!
//! 1. the primary service is asked for the chunk; identifiers it rejects as
//!    malformed are removed and the request is retried once
//! 2. identifiers absent from the response are checked one by one for
//!    demerged replacements, which are fetched in one extra request
//! 3. when the primary path fails and fallback is enabled, the secondary
//!    service is asked for the same chunk
//!
//! Failed chunks are logged and skipped. A body that is neither an error
//! marker nor well-formed XML aborts the fetch with an error.

use super::client::{ServiceResponse, UniProtClient};
use super::config::{UniProtConfig, DEFAULT_MAX_CHUNK_SIZE};
use super::error::Result;
use super::matching::{rebuild_match_result_index, search_id};
use super::models::{MatchIndex, ReferenceTable};
use super::reader::{UniProtReader, VariantRegistry};
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

const DEMERGED: &str = "DEMERGED";

/// Knobs for one `fetch_list` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_chunk_size: usize,
    pub use_primary: bool,
    pub retry_alt_api: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            use_primary: true,
            retry_alt_api: true,
        }
    }
}

impl FetchOptions {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size,
            ..Default::default()
        }
    }

    pub fn with_primary(mut self, use_primary: bool) -> Self {
        self.use_primary = use_primary;
        self
    }

    pub fn with_fallback(mut self, retry_alt_api: bool) -> Self {
        self.retry_alt_api = retry_alt_api;
        self
    }
}

/// What happened during the last `fetch_list` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub chunks: usize,
    pub failed_chunks: usize,
    /// Identifiers the primary service rejected as malformed
    pub rejected: Vec<String>,
    /// Identifiers absent from a primary response (rejected ones included)
    pub missing: Vec<String>,
    /// Replacement accessions discovered for demerged identifiers
    pub demerged: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryStatus {
    entry_type: Option<String>,
    inactive_reason: Option<InactiveReason>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InactiveReason {
    inactive_reason_type: Option<String>,
    #[serde(default)]
    merge_demerge_to: Vec<String>,
}

/// Fetches and parses UniProt entries
#[derive(Debug)]
pub struct UniProtFetcher {
    pub(crate) client: UniProtClient,
    reader: UniProtReader,
    save_text: bool,
    saved_documents: Vec<String>,
    report: FetchReport,
}

impl UniProtFetcher {
    pub fn new(config: UniProtConfig) -> Result<Self> {
        let save_text = config.save_text;
        Ok(Self {
            client: UniProtClient::new(config)?,
            reader: UniProtReader::new(),
            save_text,
            saved_documents: Vec::new(),
            report: FetchReport::default(),
        })
    }

    pub fn with_reader(mut self, reader: UniProtReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &UniProtConfig {
        self.client.config()
    }

    pub fn last_report(&self) -> &FetchReport {
        &self.report
    }

    /// Raw XML bodies kept from the last fetch when `save_text` is enabled
    pub fn saved_documents(&self) -> &[String] {
        &self.saved_documents
    }

    pub fn write_raw_xml(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.saved_documents.join("\n"))?;
        info!(path = %path.display(), documents = self.saved_documents.len(), "Wrote raw UniProt XML");
        Ok(())
    }

    /// Fetch entries for `id_list` and index how each input resolved
    pub async fn fetch_list(
        &mut self,
        id_list: &[String],
        options: FetchOptions,
    ) -> Result<(ReferenceTable, MatchIndex)> {
        self.report = FetchReport::default();
        self.saved_documents.clear();

        let mut reference = ReferenceTable::new();
        if id_list.is_empty() {
            return Ok((reference, MatchIndex::new()));
        }

        let (search_ids, variants) = process_id_list(id_list);
        let chunks = make_chunks(&dedup_preserving_order(&search_ids), options.max_chunk_size);
        debug!(inputs = id_list.len(), variants = variants.len(), "Prepared id list");

        let mut report = FetchReport {
            chunks: chunks.len(),
            ..Default::default()
        };

        for (index, chunk) in chunks.iter().enumerate() {
            info!(chunk = index + 1, of = chunks.len(), ids = chunk.len(), "Fetching UniProt entries");

            let mut demerged = Vec::new();
            match self.request_entries(chunk, options, &mut report, &mut demerged).await {
                Some(body) => self.merge_document(&body, &variants, &mut reference)?,
                None => {
                    report.failed_chunks += 1;
                    warn!(chunk = index + 1, ids = ?chunk, "No usable response for chunk, skipping");
                },
            }

            let replacements = dedup_preserving_order(&demerged);
            if !replacements.is_empty() {
                info!(ids = ?replacements, "Fetching replacements for demerged accessions");
                report.demerged.extend(replacements.iter().cloned());
                for batch in make_chunks(&replacements, options.max_chunk_size) {
                    let mut ignored = Vec::new();
                    match self.request_entries(&batch, options, &mut report, &mut ignored).await {
                        Some(body) => self.merge_document(&body, &variants, &mut reference)?,
                        None => warn!(ids = ?batch, "Replacement accessions could not be fetched"),
                    }
                }
            }
        }

        let matches = rebuild_match_result_index(id_list, &reference);
        info!(
            requested = id_list.len(),
            records = reference.len(),
            unmatched = matches.unmatched().len(),
            failed_chunks = report.failed_chunks,
            "Finished UniProt fetch"
        );
        self.report = report;
        Ok((reference, matches))
    }

    /// Rebuild the match index for an existing reference table
    pub fn rebuild_match_result_index(
        &self,
        id_list: &[String],
        reference: &ReferenceTable,
    ) -> MatchIndex {
        rebuild_match_result_index(id_list, reference)
    }

    fn merge_document(
        &mut self,
        body: &str,
        variants: &VariantRegistry,
        reference: &mut ReferenceTable,
    ) -> Result<()> {
        let table = self.reader.try_parse_document(body, variants).map_err(|e| {
            let preview: String = body.chars().take(50).collect();
            error!(error = %e, body = %preview, "Unexpected response body");
            e
        })?;
        if table.is_empty() {
            warn!("Response contained no usable entries");
        }
        if self.save_text {
            self.saved_documents.push(body.to_string());
        }
        reference.extend(table);
        Ok(())
    }

    async fn request_entries(
        &self,
        ids: &[String],
        options: FetchOptions,
        report: &mut FetchReport,
        demerged: &mut Vec<String>,
    ) -> Option<String> {
        if options.use_primary {
            if let Some(body) = self.request_primary(ids, report, demerged).await {
                return Some(body);
            }
        }

        if options.retry_alt_api {
            info!(ids = ids.len(), "Retrying using secondary service");
            match self.client.fetch_entries_secondary(ids).await {
                Ok(response) if response.is_usable() => return Some(response.body),
                Ok(response) => warn!(status = %response.status, "Secondary service request failed"),
                Err(e) => warn!(error = %e, "Secondary service request failed"),
            }
        }
        None
    }

    async fn request_primary(
        &self,
        ids: &[String],
        report: &mut FetchReport,
        demerged: &mut Vec<String>,
    ) -> Option<String> {
        let mut ids = ids.to_vec();
        let mut response = self.send_primary(&ids).await?;

        let mut rejected = Vec::new();
        if response.status == StatusCode::BAD_REQUEST {
            rejected = rejected_ids(&response.body, &ids);
            if !rejected.is_empty() {
                warn!(ids = ?rejected, "Primary service rejected malformed identifiers");
                ids.retain(|id| !rejected.contains(id));
                report.rejected.extend(rejected.iter().cloned());
                if ids.is_empty() {
                    report.missing.extend(rejected);
                    return None;
                }
                response = self.send_primary(&ids).await?;
            }
        }

        if !response.is_usable() {
            warn!(status = %response.status, ids = ids.len(), "Primary service request failed");
            return None;
        }

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !response.body.contains(&format!("<accession>{id}</accession>")))
            .cloned()
            .collect();
        for id in &missing {
            let replacements = self.demerged_replacements(id).await;
            if !replacements.is_empty() {
                debug!(id = %id, replacements = ?replacements, "Accession was demerged");
                demerged.extend(replacements);
            }
        }
        if !missing.is_empty() {
            info!(ids = ?missing, "Accessions missing from primary response");
        }
        report.missing.extend(missing);
        report.missing.extend(rejected);
        Some(response.body)
    }

    async fn send_primary(&self, ids: &[String]) -> Option<ServiceResponse> {
        match self.client.fetch_entries_primary(ids).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(error = %e, "Primary service request failed");
                None
            },
        }
    }

    async fn demerged_replacements(&self, id: &str) -> Vec<String> {
        let response = match self.client.fetch_entry_status(id).await {
            Ok(response) if response.status == StatusCode::OK => response,
            Ok(response) => {
                debug!(id, status = %response.status, "No status record for accession");
                return Vec::new();
            },
            Err(e) => {
                warn!(id, error = %e, "Accession status lookup failed");
                return Vec::new();
            },
        };
        demerged_targets(&response.body)
    }
}

/// Split input ids into search ids (input order, duplicates kept) and the
/// registry of isoform codes they carry
pub fn process_id_list(id_list: &[String]) -> (Vec<String>, VariantRegistry) {
    let mut variants = VariantRegistry::new();
    let search_ids = id_list
        .iter()
        .map(|input_id| {
            let search = search_id(input_id);
            if search.len() != input_id.len() {
                variants.register_variant(input_id, search);
            }
            search.to_string()
        })
        .collect();
    (search_ids, variants)
}

/// Fixed-size chunks in input order; a zero size is treated as one
pub fn make_chunks(ids: &[String], max_chunk_size: usize) -> Vec<Vec<String>> {
    ids.chunks(max_chunk_size.max(1)).map(<[String]>::to_vec).collect()
}

fn dedup_preserving_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Identifiers from `chunk` that a rejection body names in single quotes
fn rejected_ids(body: &str, chunk: &[String]) -> Vec<String> {
    let messages = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json
            .get("messages")
            .and_then(|m| m.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        Err(_) => body.to_string(),
    };

    let Ok(quoted) = Regex::new(r"'([^']+)'") else {
        return Vec::new();
    };
    let named: HashSet<&str> = quoted
        .captures_iter(&messages)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    chunk
        .iter()
        .filter(|id| named.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Replacement accessions of a demerged entry status record
fn demerged_targets(body: &str) -> Vec<String> {
    let Ok(status) = serde_json::from_str::<EntryStatus>(body) else {
        return Vec::new();
    };
    let inactive = status
        .entry_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("inactive"));
    match status.inactive_reason {
        Some(reason)
            if inactive
                && reason
                    .inactive_reason_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(DEMERGED)) =>
        {
            reason.merge_demerge_to
        },
        _ => Vec::new(),
    }
}

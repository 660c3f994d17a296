//! Identifier lookups through UniProt ID mapping jobs
//!
//! A job is submitted, its status is polled at a fixed interval until it
//! finishes, fails or times out, and the result pages are then followed via
//! their `Link: <...>; rel="next"` headers.

use super::error::{Result, UniProtError};
use super::fetch::UniProtFetcher;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tokio::time::Instant;
use tracing::{debug, info};

/// Source database for gene-name lookups
pub const DEFAULT_LOOKUP_SOURCE: &str = "Gene_Name";

const TARGET_DATABASE: &str = "UniProtKB";
const JOB_FINISHED: &str = "FINISHED";
const JOB_FAILED_STATES: &[&str] = &["ERROR", "FAILED", "NOT_FOUND"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    job_status: Option<String>,
    /// Present when the status request was redirected to finished results
    results: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    results: Vec<MappingRow>,
}

#[derive(Debug, Deserialize)]
struct MappingRow {
    to: Value,
}

impl UniProtFetcher {
    /// Map `items` from database `from` (e.g. "Gene_Name") to UniProtKB
    /// accessions, deduplicated in result order.
    pub async fn do_lookup(&self, items: &[String], from: &str) -> Result<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let job_id = self
            .client
            .submit_mapping_job(from, TARGET_DATABASE, items, None)
            .await?;
        info!(job_id = %job_id, items = items.len(), from, "Submitted ID mapping job");
        self.wait_for_job(&job_id).await?;

        let config = self.client.config();
        let query = vec![("size", config.page_size.to_string())];
        self.collect_results(&config.mapping_results_url(&job_id), &query)
            .await
    }

    /// UniProtKB accessions for a gene name within one taxon, optionally
    /// restricted to reviewed entries
    pub async fn do_gene_lookup(
        &self,
        gene_name: &str,
        tax_id: i64,
        reviewed: bool,
    ) -> Result<Vec<String>> {
        let job_id = self
            .client
            .submit_mapping_job(
                DEFAULT_LOOKUP_SOURCE,
                TARGET_DATABASE,
                &[gene_name.to_string()],
                Some(tax_id),
            )
            .await?;
        info!(job_id = %job_id, gene = gene_name, tax_id, reviewed, "Submitted gene lookup job");
        self.wait_for_job(&job_id).await?;

        let config = self.client.config();
        let mut query = vec![
            ("fields", "accession".to_string()),
            ("size", config.page_size.to_string()),
        ];
        if reviewed {
            query.push(("query", "reviewed:true".to_string()));
        }
        self.collect_results(&config.mapping_entry_results_url(&job_id), &query)
            .await
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<()> {
        let config = self.client.config();
        let started = Instant::now();

        loop {
            let response = self.client.mapping_status(job_id).await?;
            if !response.status.is_success() {
                return Err(UniProtError::JobFailed {
                    job_id: job_id.to_string(),
                    status: response.status.to_string(),
                });
            }

            let status: JobStatus = serde_json::from_str(&response.body)?;
            let state = status.job_status.unwrap_or_default();
            if status.results.is_some() || state == JOB_FINISHED {
                debug!(job_id, "Mapping job finished");
                return Ok(());
            }
            if JOB_FAILED_STATES.contains(&state.as_str()) {
                return Err(UniProtError::JobFailed {
                    job_id: job_id.to_string(),
                    status: state,
                });
            }

            if started.elapsed() >= config.poll_timeout() {
                return Err(UniProtError::JobTimeout {
                    job_id: job_id.to_string(),
                    timeout_secs: config.poll_timeout_secs,
                });
            }
            debug!(job_id, state = %state, "Mapping job still running");
            tokio::time::sleep(config.poll_interval()).await;
        }
    }

    async fn collect_results(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<String>> {
        let mut accessions = Vec::new();
        let mut seen = HashSet::new();
        let mut pages = 0usize;
        let mut response = self.client.get(url, query).await?;

        loop {
            if !response.status.is_success() {
                return Err(UniProtError::malformed_response(
                    "primary",
                    format!("result page returned {}", response.status),
                ));
            }
            pages += 1;

            let page: ResultPage = serde_json::from_str(&response.body)?;
            for row in page.results {
                if let Some(accession) = mapped_accession(&row.to) {
                    if seen.insert(accession.clone()) {
                        accessions.push(accession);
                    }
                }
            }

            match response.next_link.take() {
                Some(next) => response = self.client.get(&next, &[]).await?,
                None => break,
            }
        }

        debug!(pages, accessions = accessions.len(), "Collected mapping results");
        Ok(accessions)
    }
}

/// `to` is a bare accession for plain mappings and an entry object for
/// UniProtKB-joined results
fn mapped_accession(value: &Value) -> Option<String> {
    match value {
        Value::String(accession) => Some(accession.clone()),
        Value::Object(entry) => entry
            .get("primaryAccession")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapped_accession_shapes() {
        assert_eq!(mapped_accession(&json!("P69905")).as_deref(), Some("P69905"));
        assert_eq!(
            mapped_accession(&json!({"primaryAccession": "P68871", "entryType": "x"})).as_deref(),
            Some("P68871")
        );
        assert_eq!(mapped_accession(&json!(42)), None);
    }
}

//! HTTP client for the UniProt REST service and the EBI Proteins fallback
//!
//! Methods return the raw status and body; deciding what counts as a usable
//! response is left to the caller.

use super::config::UniProtConfig;
use super::error::{Result, UniProtError};
use regex::Regex;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Body prefix the services use for plain-text failures
pub const ERROR_MARKER: &str = "ERROR";

const XML_MEDIA_TYPE: &str = "application/xml";
const FASTA_MEDIA_TYPE: &str = "text/x-fasta";
const USER_AGENT: &str = concat!("seqxref/", env!("CARGO_PKG_VERSION"));

/// Status and body of one request
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub body: String,
    /// Target of a `Link: <...>; rel="next"` header
    pub next_link: Option<String>,
}

impl ServiceResponse {
    /// HTTP 200 with a non-empty body that is not an error marker
    pub fn is_usable(&self) -> bool {
        self.status == StatusCode::OK && has_content(&self.body)
    }
}

/// True for a non-empty body that does not start with the error marker
pub fn has_content(body: &str) -> bool {
    let body = body.trim_start();
    !body.is_empty() && !body.starts_with(ERROR_MARKER)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobSubmission {
    job_id: Option<String>,
}

/// Client for the primary and secondary services
#[derive(Debug, Clone)]
pub struct UniProtClient {
    client: Client,
    config: UniProtConfig,
}

impl UniProtClient {
    pub fn new(config: UniProtConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &UniProtConfig {
        &self.config
    }

    async fn send(&self, request: RequestBuilder) -> Result<ServiceResponse> {
        let response = request.send().await?;
        let status = response.status();
        let next_link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Service response");
        Ok(ServiceResponse {
            status,
            body,
            next_link,
        })
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Batch of full entries from the primary service, as XML
    pub async fn fetch_entries_primary(&self, ids: &[String]) -> Result<ServiceResponse> {
        let request = self
            .client
            .get(self.config.primary_batch_url())
            .header(ACCEPT, XML_MEDIA_TYPE)
            .query(&[("accessions", ids.join(",")), ("format", "xml".to_string())]);
        self.send(request).await
    }

    /// Batch of full entries from the secondary service, as XML
    pub async fn fetch_entries_secondary(&self, ids: &[String]) -> Result<ServiceResponse> {
        let request = self
            .client
            .get(self.config.secondary_batch_url())
            .header(ACCEPT, XML_MEDIA_TYPE)
            .query(&[("size", "-1".to_string()), ("accession", ids.join(","))]);
        self.send(request).await
    }

    /// Status record of a single accession from the primary service, as JSON
    pub async fn fetch_entry_status(&self, id: &str) -> Result<ServiceResponse> {
        let request = self
            .client
            .get(self.config.primary_entry_url(id))
            .query(&[("format", "json")]);
        self.send(request).await
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    pub async fn fetch_fasta_primary(&self, id: &str) -> Result<ServiceResponse> {
        let request = self
            .client
            .get(self.config.primary_fasta_url(id))
            .header(ACCEPT, FASTA_MEDIA_TYPE);
        self.send(request).await
    }

    pub async fn fetch_fasta_secondary(&self, id: &str) -> Result<ServiceResponse> {
        let request = self
            .client
            .get(self.config.secondary_entry_url(id))
            .header(ACCEPT, FASTA_MEDIA_TYPE);
        self.send(request).await
    }

    // ========================================================================
    // ID mapping jobs
    // ========================================================================

    /// Submit an ID mapping job and return its job id
    pub async fn submit_mapping_job(
        &self,
        from: &str,
        to: &str,
        ids: &[String],
        tax_id: Option<i64>,
    ) -> Result<String> {
        let mut form = vec![
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("ids", ids.join(",")),
        ];
        if let Some(tax_id) = tax_id {
            form.push(("taxId", tax_id.to_string()));
        }

        let response = self
            .client
            .post(self.config.mapping_run_url())
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        let submission: JobSubmission = response.json().await?;
        submission
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UniProtError::malformed_response("primary", "job submission returned no jobId"))
    }

    pub async fn mapping_status(&self, job_id: &str) -> Result<ServiceResponse> {
        let request = self.client.get(self.config.mapping_status_url(job_id));
        self.send(request).await
    }

    /// GET a URL with query parameters; used for result pages
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<ServiceResponse> {
        let request = self.client.get(url).query(query);
        self.send(request).await
    }
}

/// Extract the `rel="next"` target from an RFC 5988 `Link` header
pub fn parse_next_link(header: &str) -> Option<String> {
    let pattern = Regex::new(r#"<([^>]*)>\s*;\s*rel="?next"?"#).ok()?;
    pattern
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://rest.uniprot.org/idmapping/results/abc?cursor=x1&size=500&fields=accession,gene_names>; rel="next""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://rest.uniprot.org/idmapping/results/abc?cursor=x1&size=500&fields=accession,gene_names")
        );
    }

    #[test]
    fn test_parse_next_link_among_others() {
        let header = r#"<http://a/prev>; rel="prev", <http://a/next>; rel="next""#;
        assert_eq!(parse_next_link(header).as_deref(), Some("http://a/next"));
        assert_eq!(parse_next_link(r#"<http://a/prev>; rel="prev""#), None);
    }

    #[test]
    fn test_has_content() {
        assert!(has_content("<uniprot/>"));
        assert!(!has_content(""));
        assert!(!has_content("  \n"));
        assert!(!has_content("ERROR: service unavailable"));
    }

    #[test]
    fn test_usable_requires_ok_status() {
        let response = ServiceResponse {
            status: StatusCode::BAD_REQUEST,
            body: "<uniprot/>".to_string(),
            next_link: None,
        };
        assert!(!response.is_usable());
    }
}

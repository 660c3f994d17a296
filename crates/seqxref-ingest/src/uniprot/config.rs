//! UniProt service configuration

use super::error::{Result, UniProtError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PRIMARY_URL: &str = "https://rest.uniprot.org";
pub const DEFAULT_SECONDARY_URL: &str = "https://www.ebi.ac.uk";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Endpoints and limits for the UniProt REST service and the EBI Proteins
/// fallback service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniProtConfig {
    /// Primary service base URL (UniProt REST)
    pub primary_url: String,
    /// Fallback service base URL (EBI Proteins API)
    pub secondary_url: String,
    /// Per-request timeout in seconds (default: 300)
    pub request_timeout_secs: u64,
    /// Accessions per batch request (default: 100)
    pub max_chunk_size: usize,
    /// Delay between mapping job status checks (default: 3000 ms)
    pub poll_interval_ms: u64,
    /// Give up on a mapping job after this long (default: 600 s)
    pub poll_timeout_secs: u64,
    /// Rows requested per mapping result page (default: 500)
    pub page_size: usize,
    /// Keep raw XML bodies for later export
    pub save_text: bool,
}

impl Default for UniProtConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: DEFAULT_SECONDARY_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            save_text: false,
        }
    }
}

impl UniProtConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `SEQXREF_*` environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            primary_url: std::env::var("SEQXREF_PRIMARY_URL").unwrap_or(defaults.primary_url),
            secondary_url: std::env::var("SEQXREF_SECONDARY_URL")
                .unwrap_or(defaults.secondary_url),
            request_timeout_secs: env_parse(
                "SEQXREF_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            max_chunk_size: env_parse("SEQXREF_MAX_CHUNK_SIZE", defaults.max_chunk_size),
            poll_interval_ms: env_parse("SEQXREF_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            poll_timeout_secs: env_parse("SEQXREF_POLL_TIMEOUT_SECS", defaults.poll_timeout_secs),
            page_size: env_parse("SEQXREF_PAGE_SIZE", defaults.page_size),
            save_text: env_parse("SEQXREF_SAVE_TEXT", defaults.save_text),
        }
    }

    pub fn with_primary_url(mut self, url: impl Into<String>) -> Self {
        self.primary_url = url.into();
        self
    }

    pub fn with_secondary_url(mut self, url: impl Into<String>) -> Self {
        self.secondary_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    pub fn with_polling(mut self, interval_ms: u64, timeout_secs: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self.poll_timeout_secs = timeout_secs;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn with_save_text(mut self, save: bool) -> Self {
        self.save_text = save;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_url.trim().is_empty() {
            return Err(UniProtError::config("primary_url cannot be empty"));
        }
        if self.secondary_url.trim().is_empty() {
            return Err(UniProtError::config("secondary_url cannot be empty"));
        }
        if self.max_chunk_size == 0 {
            return Err(UniProtError::config("max_chunk_size must be greater than 0"));
        }
        if self.page_size == 0 {
            return Err(UniProtError::config("page_size must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(UniProtError::config("poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    // ========================================================================
    // Endpoint URLs
    // ========================================================================

    /// Batch entry retrieval on the primary service
    pub fn primary_batch_url(&self) -> String {
        format!("{}/uniprotkb/accessions", trim_base(&self.primary_url))
    }

    /// Single entry status on the primary service
    pub fn primary_entry_url(&self, accession: &str) -> String {
        format!("{}/uniprotkb/{}", trim_base(&self.primary_url), accession)
    }

    pub fn primary_fasta_url(&self, accession: &str) -> String {
        format!("{}/uniprotkb/{}.fasta", trim_base(&self.primary_url), accession)
    }

    pub fn secondary_batch_url(&self) -> String {
        format!("{}/proteins/api/proteins", trim_base(&self.secondary_url))
    }

    pub fn secondary_entry_url(&self, accession: &str) -> String {
        format!(
            "{}/proteins/api/proteins/{}",
            trim_base(&self.secondary_url),
            accession
        )
    }

    pub fn mapping_run_url(&self) -> String {
        format!("{}/idmapping/run", trim_base(&self.primary_url))
    }

    pub fn mapping_status_url(&self, job_id: &str) -> String {
        format!("{}/idmapping/status/{}", trim_base(&self.primary_url), job_id)
    }

    /// Plain `from -> to` mapping results
    pub fn mapping_results_url(&self, job_id: &str) -> String {
        format!("{}/idmapping/results/{}", trim_base(&self.primary_url), job_id)
    }

    /// Mapping results joined with UniProtKB entries (supports `query` filters)
    pub fn mapping_entry_results_url(&self, job_id: &str) -> String {
        format!(
            "{}/idmapping/uniprotkb/results/{}",
            trim_base(&self.primary_url),
            job_id
        )
    }
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

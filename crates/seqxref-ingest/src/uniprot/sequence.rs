//! Sequence-only lookups, one FASTA request per identifier

use super::client::ServiceResponse;
use super::error::Result;
use super::fasta::parse_fasta_record;
use super::fetch::UniProtFetcher;
use super::models::SequenceRecord;
use std::collections::{BTreeMap, HashSet};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Primary,
    Secondary,
}

impl UniProtFetcher {
    /// Fetch sequence records keyed by requested id.
    ///
    /// Ids the primary pass does not resolve are retried one by one against
    /// the secondary service when `retry_alt_api` is set. The flag is true
    /// when every requested id resolved.
    pub async fn fetch_sequence_list(
        &self,
        ids: &[String],
        use_primary: bool,
        retry_alt_api: bool,
    ) -> (bool, BTreeMap<String, SequenceRecord>) {
        let mut seen = HashSet::new();
        let ids: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();
        let mut records = BTreeMap::new();

        if use_primary {
            for id in &ids {
                if let Some(record) = self.request_sequence(id, Service::Primary).await {
                    records.insert(id.to_string(), record);
                }
            }
        }

        let remaining: Vec<&String> = ids
            .iter()
            .copied()
            .filter(|id| !records.contains_key(id.as_str()))
            .collect();
        if retry_alt_api && !remaining.is_empty() {
            info!(ids = remaining.len(), "Retrying sequences using secondary service");
            for id in remaining {
                if let Some(record) = self.request_sequence(id, Service::Secondary).await {
                    records.insert(id.to_string(), record);
                }
            }
        }

        let ok = ids.iter().all(|id| records.contains_key(id.as_str()));
        (ok, records)
    }

    async fn request_sequence(&self, id: &str, service: Service) -> Option<SequenceRecord> {
        let response: Result<ServiceResponse> = match service {
            Service::Primary => self.client.fetch_fasta_primary(id).await,
            Service::Secondary => self.client.fetch_fasta_secondary(id).await,
        };
        let response = match response {
            Ok(response) if response.is_usable() => response,
            Ok(response) => {
                warn!(id, ?service, status = %response.status, "Sequence request failed");
                return None;
            },
            Err(e) => {
                warn!(id, ?service, error = %e, "Sequence request failed");
                return None;
            },
        };

        match parse_fasta_record(&response.body) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(id, error = %e, "Parsing error in sequence data");
                None
            },
        }
    }
}

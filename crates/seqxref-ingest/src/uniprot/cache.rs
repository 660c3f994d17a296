//! Local persistence of fetched reference tables
//!
//! A [`ReferenceCache`] keeps one exported reference table on disk. Later
//! fetches only request identifiers the cached table cannot resolve.

use super::error::Result;
use super::fetch::{FetchOptions, UniProtFetcher};
use super::matching::rebuild_match_result_index;
use super::models::{MatchIndex, MatchKind, ReferenceTable};
use seqxref_common::store::{DataStore, Stamped};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReferenceCache {
    path: PathBuf,
    store: DataStore,
}

impl ReferenceCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: DataStore::new().compact(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached table, or `None` when nothing has been saved yet
    pub fn restore(&self) -> Result<Option<Stamped<ReferenceTable>>> {
        if !self.store.exists(&self.path) {
            return Ok(None);
        }
        let stamped: Stamped<ReferenceTable> = self.store.import_json(&self.path)?;
        debug!(
            path = %self.path.display(),
            records = stamped.data.len(),
            created = %stamped.created,
            "Restored reference cache"
        );
        Ok(Some(stamped))
    }

    pub fn save(&self, reference: &ReferenceTable) -> Result<()> {
        self.store.export_json(&self.path, &Stamped::now(reference))?;
        info!(path = %self.path.display(), records = reference.len(), "Saved reference cache");
        Ok(())
    }

    /// Resolve `ids` from the cache, fetching only what it lacks.
    ///
    /// Newly fetched entries are merged into the cached table and saved. The
    /// match index always covers the full `ids` list.
    pub async fn load_or_fetch(
        &self,
        fetcher: &mut UniProtFetcher,
        ids: &[String],
        options: FetchOptions,
    ) -> Result<(ReferenceTable, MatchIndex)> {
        let mut reference = match self.restore() {
            Ok(cached) => cached.map(|stamped| stamped.data).unwrap_or_default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable reference cache, starting empty");
                ReferenceTable::new()
            },
        };

        let pending = uncached_ids(ids, &reference);
        if pending.is_empty() {
            info!(ids = ids.len(), "All identifiers resolved from cache");
        } else {
            info!(cached = ids.len() - pending.len(), pending = pending.len(), "Fetching uncached identifiers");
            let (fetched, _) = fetcher.fetch_list(&pending, options).await?;
            reference.extend(fetched);
            self.save(&reference)?;
        }

        let matches = rebuild_match_result_index(ids, &reference);
        Ok((reference, matches))
    }
}

/// Ids that neither match the table nor, for isoform ids, have their own key
fn uncached_ids(ids: &[String], reference: &ReferenceTable) -> Vec<String> {
    let index = rebuild_match_result_index(ids, reference);
    index
        .iter()
        .filter(|result| {
            result.matched == MatchKind::Unmatched
                || (result.input_id != result.search_id && !reference.contains_key(&result.input_id))
        })
        .map(|result| result.input_id.clone())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::uniprot::config::UniProtConfig;
    use crate::uniprot::models::EntryRecord;
    use tempfile::TempDir;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn table() -> ReferenceTable {
        let mut reference = ReferenceTable::new();
        reference.insert(
            "P69905".to_string(),
            EntryRecord {
                db_accession: Some("P69905".to_string()),
                accessions: ids(&["P69905", "P01922"]),
                taxonomy_id: Some(9606),
                ..Default::default()
            },
        );
        reference
    }

    #[test]
    fn test_restore_missing_cache() {
        let dir = TempDir::new().unwrap();
        let cache = ReferenceCache::new(dir.path().join("reference.json"));
        assert!(cache.restore().unwrap().is_none());
    }

    #[test]
    fn test_save_and_restore() {
        let dir = TempDir::new().unwrap();
        let cache = ReferenceCache::new(dir.path().join("cache/reference.json"));
        cache.save(&table()).unwrap();

        let restored = cache.restore().unwrap().unwrap();
        assert_eq!(restored.data, table());
        assert!(!std::fs::read_to_string(cache.path()).unwrap().contains('\n'));
    }

    #[test]
    fn test_uncached_ids() {
        let reference = table();
        let pending = uncached_ids(&ids(&["P69905", "P01922", "P69905-2", "Q9XXXX"]), &reference);
        assert_eq!(pending, ids(&["P69905-2", "Q9XXXX"]));
    }

    #[tokio::test]
    async fn test_fully_cached_request_skips_network() {
        let dir = TempDir::new().unwrap();
        let cache = ReferenceCache::new(dir.path().join("reference.json"));
        cache.save(&table()).unwrap();

        // nothing listens here; any request would fail the fetch
        let config = UniProtConfig::new()
            .with_primary_url("http://127.0.0.1:9")
            .with_secondary_url("http://127.0.0.1:9");
        let mut fetcher = UniProtFetcher::new(config).unwrap();

        let (reference, matches) = cache
            .load_or_fetch(&mut fetcher, &ids(&["P01922"]), FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(reference.len(), 1);
        assert_eq!(matches.get("P01922").unwrap().matched, MatchKind::Secondary);
        assert_eq!(fetcher.last_report().chunks, 0);
    }
}

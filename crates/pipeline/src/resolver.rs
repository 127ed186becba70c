//! Hash reconciliation engine.
//!
//! Resolves content hashes to catalog version records through the durable
//! cache: hashes already cached (found or not-found) are answered locally;
//! the rest are deduplicated, batched against the catalog's by-hash
//! endpoint, and the results written back so a hash is never looked up
//! twice.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use curator_cache::KeyValueStore;
use curator_catalog::{CatalogClient, CatalogError, ModelVersion, MAX_HASH_BATCH};
use serde_json::Value;

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Lookup seam
// ---------------------------------------------------------------------------

/// Remote batch-lookup capability the resolver depends on.
///
/// Implemented by [`CatalogClient`]; tests substitute a recording mock.
#[async_trait]
pub trait HashLookup: Send + Sync {
    /// Look up model versions for up to [`MAX_HASH_BATCH`] file hashes.
    async fn versions_by_hash(&self, hashes: &[String]) -> Result<Vec<ModelVersion>, CatalogError>;
}

#[async_trait]
impl HashLookup for CatalogClient {
    async fn versions_by_hash(&self, hashes: &[String]) -> Result<Vec<ModelVersion>, CatalogError> {
        CatalogClient::versions_by_hash(self, hashes).await
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Reconciles content hashes against the catalog through the cache.
#[derive(Clone)]
pub struct HashResolver {
    lookup: Arc<dyn HashLookup>,
    store: Arc<dyn KeyValueStore>,
}

impl HashResolver {
    pub fn new(lookup: Arc<dyn HashLookup>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { lookup, store }
    }

    /// Resolve every input hash to its catalog version record, or `None`
    /// for hashes the catalog does not know.
    ///
    /// The result has the same length and order as the input, duplicates
    /// included. Hashes are matched case-insensitively (lowercased).
    /// Already-cached hashes (including cached not-found markers) cost
    /// no network call; the rest are fetched in batches of at most
    /// [`MAX_HASH_BATCH`].
    ///
    /// When a batch fails mid-pass, the records from batches that already
    /// completed are still written to the cache before the error
    /// propagates, so a retry does not re-fetch them.
    pub async fn resolve(&self, hashes: &[String]) -> Result<Vec<Option<ModelVersion>>, PipelineError> {
        let inputs: Vec<String> = hashes.iter().map(|h| h.to_lowercase()).collect();

        // Partition into cached and missing, deduplicating the misses.
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for hash in &inputs {
            if seen.insert(hash.clone()) && !self.store.contains(hash).await? {
                missing.push(hash.clone());
            }
        }

        let mut fetched: Vec<ModelVersion> = Vec::new();
        let mut failure: Option<CatalogError> = None;
        for chunk in missing.chunks(MAX_HASH_BATCH) {
            match self.lookup.versions_by_hash(chunk).await {
                Ok(mut records) => fetched.append(&mut records),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.write_records(&fetched).await?;

        if let Some(err) = failure {
            return Err(err.into());
        }

        // Memoize definite misses so they are never queried again. This
        // only happens after a fully successful pass; an aborted pass must
        // not mark unqueried hashes as not-found.
        for hash in &missing {
            if !self.store.contains(hash).await? {
                self.store.set(hash, Value::Null).await?;
            }
        }

        let mut results = Vec::with_capacity(inputs.len());
        for hash in &inputs {
            results.push(self.cached_version(hash).await?);
        }
        Ok(results)
    }

    /// Like [`resolve`](Self::resolve), but returns only the records that
    /// were found, in input order.
    pub async fn resolve_found(&self, hashes: &[String]) -> Result<Vec<ModelVersion>, PipelineError> {
        Ok(self.resolve(hashes).await?.into_iter().flatten().collect())
    }

    /// Map every file hash inside `records` onto its owning record.
    ///
    /// Records are processed most-recently-created first; the first record
    /// to claim a hash within this pass wins and later (older) claims are
    /// skipped.
    async fn write_records(&self, records: &[ModelVersion]) -> Result<(), PipelineError> {
        let mut ordered: Vec<&ModelVersion> = records.iter().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut written = HashSet::new();
        for record in ordered {
            let value = serde_json::to_value(record)?;
            for file in &record.files {
                let Some(sha256) = file.sha256() else {
                    continue;
                };
                let sha256 = sha256.to_lowercase();
                if !written.insert(sha256.clone()) {
                    continue;
                }
                self.store.set(&sha256, value.clone()).await?;
            }
        }
        Ok(())
    }

    /// Read a cached version record; `null` markers and unparseable values
    /// resolve to `None`.
    async fn cached_version(&self, hash: &str) -> Result<Option<ModelVersion>, PipelineError> {
        let Some(value) = self.store.get(hash).await? else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Utc};
    use curator_cache::MemoryStore;
    use curator_catalog::ModelFile;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Recording mock: serves records whose file hashes intersect the
    /// requested batch, and logs every successful batch size.
    #[derive(Default)]
    struct MockLookup {
        records: Vec<ModelVersion>,
        batches: Mutex<Vec<usize>>,
        /// 1-based call number that fails (once); later calls succeed.
        fail_on_call: Option<usize>,
        calls: Mutex<usize>,
    }

    impl MockLookup {
        fn with_records(records: Vec<ModelVersion>) -> Self {
            Self {
                records,
                ..Default::default()
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HashLookup for MockLookup {
        async fn versions_by_hash(
            &self,
            hashes: &[String],
        ) -> Result<Vec<ModelVersion>, CatalogError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.fail_on_call == Some(call) {
                return Err(CatalogError::Api {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.batches.lock().unwrap().push(hashes.len());

            Ok(self
                .records
                .iter()
                .filter(|r| {
                    r.files.iter().any(|f| {
                        f.sha256()
                            .is_some_and(|sha| hashes.contains(&sha.to_lowercase()))
                    })
                })
                .cloned()
                .collect())
        }
    }

    fn version(id: i64, created_at: &str, sha256: &str) -> ModelVersion {
        ModelVersion {
            id,
            model_id: id * 10,
            name: None,
            created_at: created_at.parse::<DateTime<Utc>>().unwrap(),
            base_model: Some("SDXL 1.0".to_string()),
            trained_words: vec![],
            files: vec![ModelFile {
                name: None,
                hashes: HashMap::from([("SHA256".to_string(), sha256.to_string())]),
            }],
            images: vec![],
        }
    }

    fn resolver(lookup: MockLookup) -> (Arc<MockLookup>, HashResolver) {
        let lookup = Arc::new(lookup);
        let store = Arc::new(MemoryStore::new());
        (lookup.clone(), HashResolver::new(lookup, store))
    }

    #[tokio::test]
    async fn results_align_with_input_order_and_duplicates() {
        let record = version(1, "2024-01-01T00:00:00Z", "AAAA");
        let (_lookup, resolver) = resolver(MockLookup::with_records(vec![record]));

        let results = resolver
            .resolve(&["aaaa".into(), "bbbb".into(), "aaaa".into()])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().id, 1);
        assert!(results[1].is_none());
        assert_eq!(results[2].as_ref().unwrap().id, 1);
    }

    #[tokio::test]
    async fn second_resolve_is_a_full_cache_hit() {
        let record = version(1, "2024-01-01T00:00:00Z", "AAAA");
        let (lookup, resolver) = resolver(MockLookup::with_records(vec![record]));

        let hashes = vec!["aaaa".to_string(), "bbbb".to_string()];
        resolver.resolve(&hashes).await.unwrap();
        assert_eq!(lookup.batch_sizes(), vec![2]);

        let results = resolver.resolve(&hashes).await.unwrap();
        assert_eq!(lookup.batch_sizes(), vec![2]);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
    }

    #[tokio::test]
    async fn not_found_hashes_are_memoized() {
        let (lookup, resolver) = resolver(MockLookup::default());

        let results = resolver.resolve(&["cccc".into()]).await.unwrap();
        assert_eq!(results, vec![None]);
        assert_eq!(lookup.batch_sizes(), vec![1]);

        resolver.resolve(&["cccc".into()]).await.unwrap();
        assert_eq!(lookup.batch_sizes(), vec![1]);
    }

    #[tokio::test]
    async fn uncached_hashes_are_chunked_in_hundreds() {
        let (lookup, resolver) = resolver(MockLookup::default());

        let hashes: Vec<String> = (0..250).map(|i| format!("{i:064x}")).collect();
        resolver.resolve(&hashes).await.unwrap();
        assert_eq!(lookup.batch_sizes(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn duplicate_inputs_are_looked_up_once() {
        let (lookup, resolver) = resolver(MockLookup::default());

        resolver
            .resolve(&["dddd".into(), "DDDD".into(), "dddd".into()])
            .await
            .unwrap();
        assert_eq!(lookup.batch_sizes(), vec![1]);
    }

    #[tokio::test]
    async fn most_recent_record_claims_a_contested_hash() {
        let older = version(1, "2023-01-01T00:00:00Z", "AAAA");
        let newer = version(2, "2024-06-01T00:00:00Z", "aaaa");
        let (_lookup, resolver) = resolver(MockLookup::with_records(vec![older, newer]));

        let results = resolver.resolve(&["aaaa".into()]).await.unwrap();
        assert_eq!(results[0].as_ref().unwrap().id, 2);
    }

    #[tokio::test]
    async fn failed_batch_keeps_completed_results_and_propagates() {
        let record = version(1, "2024-01-01T00:00:00Z", "0".repeat(64).as_str());
        let mut lookup = MockLookup::with_records(vec![record]);
        lookup.fail_on_call = Some(2);
        let (lookup, resolver) = resolver(lookup);

        let hashes: Vec<String> = (0..150).map(|i| format!("{i:064x}")).collect();
        let err = resolver.resolve(&hashes).await.unwrap_err();
        assert_matches!(err, PipelineError::Catalog(CatalogError::Api { status: 500, .. }));
        assert_eq!(lookup.batch_sizes(), vec![100]);

        // The record from the completed batch is cached, so the retry skips
        // it. Nothing was null-marked by the aborted pass, so the other 149
        // hashes are queried again.
        let results = resolver.resolve(&hashes).await.unwrap();
        assert_eq!(lookup.batch_sizes(), vec![100, 100, 49]);
        assert_eq!(results[0].as_ref().unwrap().id, 1);
    }

    #[tokio::test]
    async fn resolve_found_flattens_misses() {
        let record = version(1, "2024-01-01T00:00:00Z", "AAAA");
        let (_lookup, resolver) = resolver(MockLookup::with_records(vec![record]));

        let found = resolver
            .resolve_found(&["bbbb".into(), "aaaa".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }
}

//! Background sync jobs.
//!
//! [`SyncJobs`] owns everything the two jobs need (settings, hasher,
//! resolver, HTTP client) plus one mutex per job. A job may run
//! concurrently with the other but never with itself: repeated triggers
//! queue on the job's own lock. Jobs are spawned as tracked tasks whose
//! handles the caller can join.

use std::sync::Arc;

use curator_cache::KeyValueStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::PipelineError;
use crate::hasher::FileHasher;
use crate::info_sync::sync_info_files;
use crate::preview_sync::sync_preview_images;
use crate::resolver::{HashLookup, HashResolver};
use crate::settings::Settings;

/// The two startup sync jobs and their serialization locks.
pub struct SyncJobs {
    settings: Settings,
    hasher: FileHasher,
    resolver: HashResolver,
    http: reqwest::Client,
    info_lock: Mutex<()>,
    preview_lock: Mutex<()>,
}

impl SyncJobs {
    /// Wire up the jobs from their collaborators.
    ///
    /// * `versions` - cache namespace for catalog lookups by hash.
    /// * `digests`  - cache namespace for memoized file digests.
    pub fn new(
        settings: Settings,
        lookup: Arc<dyn HashLookup>,
        versions: Arc<dyn KeyValueStore>,
        digests: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            hasher: FileHasher::new(digests),
            resolver: HashResolver::new(lookup, versions),
            http: reqwest::Client::new(),
            info_lock: Mutex::new(()),
            preview_lock: Mutex::new(()),
        })
    }

    /// Run the info-sidecar job, serialized against itself.
    pub async fn run_info_sync(&self) -> Result<usize, PipelineError> {
        let _guard = self.info_lock.lock().await;
        sync_info_files(&self.settings, &self.hasher, &self.resolver).await
    }

    /// Run the preview-image job, serialized against itself.
    pub async fn run_preview_sync(&self) -> Result<usize, PipelineError> {
        let _guard = self.preview_lock.lock().await;
        sync_preview_images(&self.settings, &self.hasher, &self.resolver, &self.http, None).await
    }

    /// Spawn both jobs. The returned handles let the caller observe
    /// completion instead of firing and forgetting.
    pub fn spawn_all(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let info = {
            let jobs = Arc::clone(self);
            tokio::spawn(async move {
                match jobs.run_info_sync().await {
                    Ok(written) => tracing::debug!(written, "Info sync finished"),
                    Err(err) => tracing::error!(error = %err, "Info sync failed"),
                }
            })
        };
        let preview = {
            let jobs = Arc::clone(self);
            tokio::spawn(async move {
                match jobs.run_preview_sync().await {
                    Ok(written) => tracing::debug!(written, "Preview sync finished"),
                    Err(err) => tracing::error!(error = %err, "Preview sync failed"),
                }
            })
        };
        vec![info, preview]
    }
}

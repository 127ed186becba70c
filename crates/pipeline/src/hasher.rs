//! Cached file hashing.
//!
//! Content hashes are expensive for multi-gigabyte model files, so digests
//! are memoized in the durable store keyed by path and validated against
//! the file's size and modification time. An unchanged file hashes once
//! across process restarts; a changed file is re-digested.

use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use curator_cache::KeyValueStore;
use curator_core::hashing::sha256_file;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Memoized digest record stored per file path.
#[derive(Debug, Serialize, Deserialize)]
struct DigestEntry {
    size: u64,
    mtime_ns: u64,
    sha256: String,
}

/// Computes lowercase SHA-256 digests of files, memoized in a store.
#[derive(Clone)]
pub struct FileHasher {
    store: Arc<dyn KeyValueStore>,
}

impl FileHasher {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Lowercase SHA-256 of the file at `path`.
    ///
    /// Returns the stored digest when the file's size and mtime match the
    /// memoized entry; otherwise digests the file and updates the store.
    pub async fn hash_file(&self, path: &Path) -> Result<String, PipelineError> {
        let metadata = std::fs::metadata(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let size = metadata.len();
        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let key = path.to_string_lossy().into_owned();
        if let Some(value) = self.store.get(&key).await? {
            if let Ok(entry) = serde_json::from_value::<DigestEntry>(value) {
                if entry.size == size && entry.mtime_ns == mtime_ns {
                    return Ok(entry.sha256);
                }
            }
        }

        let sha256 = sha256_file(path)?;
        let entry = DigestEntry {
            size,
            mtime_ns,
            sha256: sha256.clone(),
        };
        self.store.set(&key, serde_json::to_value(&entry)?).await?;
        Ok(sha256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_cache::MemoryStore;
    use curator_core::hashing::sha256_hex;
    use serde_json::json;

    fn hasher() -> (Arc<MemoryStore>, FileHasher) {
        let store = Arc::new(MemoryStore::new());
        let hasher = FileHasher::new(store.clone());
        (store, hasher)
    }

    #[tokio::test]
    async fn digests_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        std::fs::write(&path, b"weights").unwrap();

        let (store, hasher) = hasher();
        let digest = hasher.hash_file(&path).await.unwrap();
        assert_eq!(digest, sha256_hex(b"weights"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_file_served_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        std::fs::write(&path, b"weights").unwrap();

        let (store, hasher) = hasher();
        hasher.hash_file(&path).await.unwrap();

        // Forge the stored digest while keeping size/mtime valid; a second
        // call returning the forged value proves the file was not re-read.
        let key = path.to_string_lossy().into_owned();
        let mut entry = store.get(&key).await.unwrap().unwrap();
        entry["sha256"] = json!("forged");
        store.set(&key, entry).await.unwrap();

        assert_eq!(hasher.hash_file(&path).await.unwrap(), "forged");
    }

    #[tokio::test]
    async fn changed_content_is_redigested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        std::fs::write(&path, b"weights").unwrap();

        let (_store, hasher) = hasher();
        let first = hasher.hash_file(&path).await.unwrap();

        std::fs::write(&path, b"different weights").unwrap();
        let second = hasher.hash_file(&path).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second, sha256_hex(b"different weights"));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let (_store, hasher) = hasher();
        let err = hasher
            .hash_file(Path::new("/nonexistent/x.ckpt"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}

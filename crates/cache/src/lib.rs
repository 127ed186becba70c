//! Durable key→JSON-value cache.
//!
//! The sync pipeline memoizes two kinds of facts: catalog lookups by
//! content hash (including negative results) and file digests keyed by
//! path. Both go through the [`KeyValueStore`] trait so the engine never
//! cares where the bytes live. [`CacheDb`] is the SQLite-backed production
//! implementation; [`MemoryStore`] backs tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryStore;
pub use sqlite::{CacheDb, SqliteStore};

/// Errors from the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The underlying database failed.
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer parses as JSON.
    #[error("Corrupt cache value for key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The cache location could not be prepared.
    #[error("Cache path error: {0}")]
    Path(#[from] std::io::Error),
}

/// A durable string-keyed JSON store.
///
/// `Value::Null` is a legitimate stored value (a memoized "not found"),
/// distinct from an absent key; [`contains`](Self::contains) reports the
/// difference.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;

    /// Whether any value (including `null`) is stored under `key`.
    async fn contains(&self, key: &str) -> Result<bool, CacheError>;
}

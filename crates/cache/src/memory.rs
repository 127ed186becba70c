//! In-memory [`KeyValueStore`] for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CacheError, KeyValueStore};

/// Non-durable store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self
            .entries
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .entries
            .lock()
            .expect("store mutex poisoned")
            .contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn basic_round_trip() {
        let store = MemoryStore::new();
        store.set("k", json!("v")).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
        assert!(store.contains("k").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn null_is_contained() {
        let store = MemoryStore::new();
        store.set("k", Value::Null).await.unwrap();
        assert!(store.contains("k").await.unwrap());
    }
}

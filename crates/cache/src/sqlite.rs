//! SQLite-backed cache store.
//!
//! One database file holds every namespace. [`CacheDb::connect`] opens (or
//! creates) the file and the `kv` table; [`CacheDb::namespace`] hands out
//! lightweight [`SqliteStore`] handles sharing the same pool.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{CacheError, KeyValueStore};

const CREATE_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS kv (
    namespace TEXT NOT NULL,
    key       TEXT NOT NULL,
    value     TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
)";

/// Handle to the cache database file.
#[derive(Clone)]
pub struct CacheDb {
    pool: SqlitePool,
}

impl CacheDb {
    /// Open the cache database at `path`, creating the file, its parent
    /// directory, and the schema as needed.
    pub async fn connect(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        tracing::debug!(path = %path.display(), "Cache database ready");

        Ok(Self { pool })
    }

    /// A store view over one namespace of this database.
    pub fn namespace(&self, namespace: &str) -> SqliteStore {
        SqliteStore {
            pool: self.pool.clone(),
            namespace: namespace.to_string(),
        }
    }
}

/// [`KeyValueStore`] over one namespace of a [`CacheDb`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    namespace: String,
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv WHERE namespace = ?1 AND key = ?2")
                .bind(&self.namespace)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|source| CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let text = value.to_string();
        sqlx::query(
            "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM kv WHERE namespace = ?1 AND key = ?2")
                .bind(&self.namespace)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

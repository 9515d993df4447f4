//! Key-value storage for configurations, run metadata and quota counters.
//!
//! Every component receives an explicit store handle. Two backends exist:
//! PostgreSQL for deployments and an in-process map for tests and
//! single-node setups.
//!
//! ## Key schema
//!
//! ```text
//! config:{sha256(form_id)}               → Configuration JSON
//! metadata:{sha256(form_id)}             → RunMetadata JSON (expires)
//! ratelimit:{version}:{identity}         → integer counter (expires)
//! ```

pub mod keys;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt value at '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),
}

/// Contract every backend fulfils. Expired entries are invisible to all
/// operations.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace. `None` means the entry never expires.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All live entries whose key starts with `prefix`, ordered by key
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Atomically increments the integer counter at `key` when it is below
    /// `ceiling`, returning the new count. A missing or expired counter
    /// starts at 1 and expires after `ttl`; an existing counter keeps its
    /// expiry. Returns `None` without mutating when the ceiling is reached.
    async fn increment_below(
        &self,
        key: &str,
        ceiling: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, StoreError>;

    /// Physically removes expired entries, returning how many were dropped
    /// Decrements a live counter, never below zero, keeping its expiry.
    /// Missing or expired counters are left alone.
    async fn decrement_floor(&self, key: &str) -> Result<(), StoreError>;

    async fn purge_expired(&self) -> Result<u64, StoreError>;

    async fn health_check(&self) -> bool;
}

/// Shared handle passed to services, routes and the tick loop
pub type SharedStore = Arc<dyn KvStore>;

/// Reads and deserializes a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Serializes and writes a JSON value
pub async fn put_json<T: Serialize>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.put(key, &raw, ttl).await
}

/// Parses the integer form used by counters
pub(crate) fn parse_counter(key: &str, raw: &str) -> Result<i64, StoreError> {
    raw.trim().parse().map_err(|_| StoreError::Corrupt {
        key: key.to_string(),
        message: format!("expected integer counter, got '{}'", raw),
    })
}

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{parse_counter, KvStore, StoreError};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process store. Expiry is evaluated against the injected clock.
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
        let delta = TimeDelta::from_std(ttl).map_err(|e| StoreError::InvalidTtl(e.to_string()))?;
        Ok(self.clock.now() + delta)
    }

    /// Entries held, expired ones not yet purged included
    pub async fn stored_entries(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Expiry of a live entry, for assertions in tests
    pub async fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| self.expiry(ttl)).transpose()?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }

    async fn increment_below(
        &self,
        key: &str,
        ceiling: i64,
        ttl: Duration,
    ) -> Result<Option<i64>, StoreError> {
        if ceiling <= 0 {
            return Ok(None);
        }

        let now = self.clock.now();
        let fresh_expiry = self.expiry(ttl)?;

        // Held across read and write, which makes the increment atomic
        let mut entries = self.entries.lock().await;

        let (current, expires_at) = match entries.get(key).filter(|e| e.is_live(now)) {
            Some(entry) => (parse_counter(key, &entry.value)?, entry.expires_at),
            None => (0, Some(fresh_expiry)),
        };

        if current >= ceiling {
            return Ok(None);
        }

        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(Some(next))
    }

    async fn decrement_floor(&self, key: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(key).filter(|e| e.is_live(now)) {
            let current = parse_counter(key, &entry.value)?;
            if current > 0 {
                entry.value = (current - 1).to_string();
            }
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok((before - entries.len()) as u64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::{KvStore, StoreError};

/// Condition shared by every read: the row has not expired yet
const LIVE: &str = "(expires_at IS NULL OR expires_at > now())";

/// Store backed by the `kv_entries` table. Expiry uses database time.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn ttl_secs(ttl: Duration) -> Result<i64, StoreError> {
    i64::try_from(ttl.as_secs()).map_err(|e| StoreError::InvalidTtl(e.to_string()))
}

#[async_trait]
impl KvStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let query = format!("SELECT value FROM kv_entries WHERE key = $1 AND {}", LIVE);
        let value: Option<String> = sqlx::query_scalar(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let ttl = ttl.map(ttl_secs).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES (
                $1, $2,
                CASE WHEN $3::bigint IS NULL THEN NULL
                     ELSE now() + $3::bigint * interval '1 second' END,
                now()
            )
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at,
                updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let query = format!(
            r#"
            SELECT key, value FROM kv_entries
            WHERE left(key, length($1)) = $1 AND {}
            ORDER BY key
            "#,
            LIVE
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&query)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
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
        let ttl = ttl_secs(ttl)?;

        // Single upsert: the row lock taken by ON CONFLICT serializes
        // concurrent reservations for the same key. An expired row restarts
        // at 1 with a fresh expiry.
        let next: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO kv_entries (key, value, expires_at, updated_at)
            VALUES ($1, '1', now() + $3::bigint * interval '1 second', now())
            ON CONFLICT (key) DO UPDATE
            SET value = CASE
                    WHEN kv_entries.expires_at IS NOT NULL AND kv_entries.expires_at <= now()
                        THEN '1'
                    ELSE (kv_entries.value::bigint + 1)::text
                END,
                expires_at = CASE
                    WHEN kv_entries.expires_at IS NOT NULL AND kv_entries.expires_at <= now()
                        THEN EXCLUDED.expires_at
                    ELSE kv_entries.expires_at
                END,
                updated_at = now()
            WHERE (kv_entries.expires_at IS NOT NULL AND kv_entries.expires_at <= now())
               OR kv_entries.value::bigint < $2
            RETURNING value::bigint
            "#,
        )
        .bind(key)
        .bind(ceiling)
        .bind(ttl)
        .fetch_optional(&self.pool)
        .await?;

        Ok(next)
    }

    async fn decrement_floor(&self, key: &str) -> Result<(), StoreError> {
        let query = format!(
            r#"
            UPDATE kv_entries
            SET value = (value::bigint - 1)::text, updated_at = now()
            WHERE key = $1 AND value::bigint > 0 AND {}
            "#,
            LIVE
        );
        sqlx::query(&query).bind(key).execute(&self.pool).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= now()")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> bool {
        crate::db::health_check(&self.pool).await
    }
}

use crate::config::QuotaConfig;
use crate::error::AppResult;
use crate::store::{keys, parse_counter, KvStore};

pub struct QuotaService;

impl QuotaService {
    /// Current count for `identity` in this window (0 when absent or expired)
    pub async fn count(store: &dyn KvStore, config: &QuotaConfig, identity: &str) -> AppResult<i64> {
        let key = keys::quota_key(&config.key_version, identity);
        match store.get(&key).await? {
            Some(raw) => Ok(parse_counter(&key, &raw)?),
            None => Ok(0),
        }
    }

    /// Read-only pre-flight: true when another reservation would succeed
    pub async fn check_only(
        store: &dyn KvStore,
        config: &QuotaConfig,
        identity: &str,
    ) -> AppResult<bool> {
        let count = Self::count(store, config, identity).await?;
        Ok(count < config.max_new_configs_per_day)
    }

    /// Consumes one new-configuration slot. Returns false, without mutating,
    /// when the ceiling is already reached.
    pub async fn try_reserve(
        store: &dyn KvStore,
        config: &QuotaConfig,
        identity: &str,
    ) -> AppResult<bool> {
        let key = keys::quota_key(&config.key_version, identity);
        let reserved = store
            .increment_below(&key, config.max_new_configs_per_day, config.window)
            .await?;

        match reserved {
            Some(count) => {
                log::debug!(
                    "Quota reserved for {} ({}/{})",
                    identity,
                    count,
                    config.max_new_configs_per_day
                );
                Ok(true)
            }
            None => {
                log::warn!(
                    "Quota exhausted for {} (limit {})",
                    identity,
                    config.max_new_configs_per_day
                );
                Ok(false)
            }
        }
    }

    /// Gives back a slot taken by `try_reserve` when the save it was
    /// reserved for did not happen
    pub async fn release(
        store: &dyn KvStore,
        config: &QuotaConfig,
        identity: &str,
    ) -> AppResult<()> {
        let key = keys::quota_key(&config.key_version, identity);
        store.decrement_floor(&key).await?;
        log::debug!("Quota slot released for {}", identity);
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::config::{QuotaConfig, RetentionConfig};
use crate::error::{AppError, AppResult};
use crate::gateway::FormGateway;
use crate::models::{Configuration, FieldRule, SaveConfiguration, MAX_OFFSET_DAYS};
use crate::services::patcher::{PatchResult, PatchService};
use crate::services::quota::QuotaService;
use crate::store::{get_json, keys, put_json, KvStore};

/// Result of the patch run right after a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Patched(PatchResult),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub configuration: Configuration,
    /// True when no configuration existed for this form before
    pub created: bool,
    /// `None` when the configuration is inactive and nothing was attempted
    pub applied: Option<ApplyOutcome>,
}

/// Validated save request
struct ValidSave {
    form_id: String,
    credential: String,
    timezone: Tz,
    fields: BTreeMap<String, FieldRule>,
}

/// Form ids are compared without surrounding whitespace everywhere
pub fn normalize_form_id(form_id: &str) -> &str {
    form_id.trim()
}

pub struct ConfigurationService;

impl ConfigurationService {
    /// Lists every live configuration. Undecodable entries are skipped.
    pub async fn list(store: &dyn KvStore) -> AppResult<Vec<Configuration>> {
        let entries = store.list_prefix(keys::CONFIG_PREFIX).await?;

        let configurations = entries
            .into_iter()
            .filter_map(
                |(key, raw)| match serde_json::from_str::<Configuration>(&raw) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        log::warn!("Skipping unreadable configuration at {}: {}", key, e);
                        None
                    }
                },
            )
            .collect();

        Ok(configurations)
    }

    pub async fn get(store: &dyn KvStore, form_id: &str) -> AppResult<Option<Configuration>> {
        Ok(get_json(store, &keys::config_key(normalize_form_id(form_id))).await?)
    }

    pub async fn get_required(store: &dyn KvStore, form_id: &str) -> AppResult<Configuration> {
        Self::get(store, form_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Configuration for form {} not found", form_id))
        })
    }

    /// Returns the configuration only when `credential` matches the stored
    /// one; a mismatch reads as not found.
    pub async fn get_authorized(
        store: &dyn KvStore,
        form_id: &str,
        credential: &str,
    ) -> AppResult<Configuration> {
        let configuration = Self::get_required(store, form_id).await?;
        if configuration.credential != credential {
            return Err(AppError::NotFound(format!(
                "Configuration for form {} not found",
                form_id
            )));
        }
        Ok(configuration)
    }

    /// Writes a configuration. Inactive ones expire after the grace period.
    pub async fn persist(
        store: &dyn KvStore,
        config: &Configuration,
        retention: &RetentionConfig,
    ) -> AppResult<()> {
        let ttl = if config.active {
            None
        } else {
            Some(retention.disabled_config_ttl)
        };
        put_json(store, &keys::config_key(&config.form_id), config, ttl).await?;
        Ok(())
    }

    fn validate(input: SaveConfiguration) -> AppResult<ValidSave> {
        let form_id = input.form_id.as_deref().map(normalize_form_id).unwrap_or_default();
        if form_id.is_empty() {
            return Err(AppError::Validation("form_id is required".to_string()));
        }
        if form_id.len() > 255 {
            return Err(AppError::Validation(
                "form_id cannot exceed 255 characters".to_string(),
            ));
        }

        let credential = input.credential.as_deref().map(str::trim).unwrap_or_default();
        if credential.is_empty() {
            return Err(AppError::Validation("credential is required".to_string()));
        }

        let timezone_name = input.timezone.as_deref().map(str::trim).unwrap_or_default();
        if timezone_name.is_empty() {
            return Err(AppError::Validation("timezone is required".to_string()));
        }
        let timezone: Tz = timezone_name.parse().map_err(|_| {
            AppError::Validation(format!("Unknown timezone '{}'", timezone_name))
        })?;

        for (field_id, rule) in &input.fields {
            if field_id.trim().is_empty() {
                return Err(AppError::Validation("Field ids cannot be empty".to_string()));
            }
            for offset in [rule.min_days, rule.max_days].into_iter().flatten() {
                if !(-MAX_OFFSET_DAYS..=MAX_OFFSET_DAYS).contains(&offset) {
                    return Err(AppError::Validation(format!(
                        "Offsets for field {} must be within ±{} days",
                        field_id, MAX_OFFSET_DAYS
                    )));
                }
            }
            if let (Some(min), Some(max)) = (rule.min_days, rule.max_days) {
                if rule.enabled && min > max {
                    return Err(AppError::Validation(format!(
                        "min_days cannot exceed max_days for field {}",
                        field_id
                    )));
                }
            }
        }

        Ok(ValidSave {
            form_id: form_id.to_string(),
            credential: credential.to_string(),
            timezone,
            fields: input.fields,
        })
    }

    /// Creates or replaces a configuration.
    ///
    /// Brand-new configurations consume one quota slot for `identity`;
    /// replacing an existing one never does, but requires the stored
    /// credential. An active configuration is patched right away, and a
    /// failed patch is reported in the outcome without undoing the save.
    pub async fn save(
        store: &dyn KvStore,
        gateway: &dyn FormGateway,
        quota: &QuotaConfig,
        retention: &RetentionConfig,
        identity: &str,
        input: SaveConfiguration,
        now: DateTime<Utc>,
    ) -> AppResult<SaveOutcome> {
        let valid = Self::validate(input)?;

        let existing = Self::get(store, &valid.form_id).await?;
        let created = existing.is_none();

        if let Some(current) = &existing {
            if current.credential != valid.credential {
                return Err(AppError::NotFound(format!(
                    "Configuration for form {} not found",
                    valid.form_id
                )));
            }
        }

        if created && !QuotaService::try_reserve(store, quota, identity).await? {
            return Err(AppError::QuotaExceeded(format!(
                "At most {} new configurations per day",
                quota.max_new_configs_per_day
            )));
        }

        let active = Configuration::compute_active(&valid.fields);
        let mut configuration = Configuration {
            form_id: valid.form_id,
            credential: valid.credential,
            timezone: valid.timezone,
            fields: valid.fields,
            active,
            last_run_at: existing.as_ref().and_then(|c| c.last_run_at),
            created_at: existing.as_ref().map_or(now, |c| c.created_at),
            updated_at: now,
        };

        if let Err(e) = Self::persist(store, &configuration, retention).await {
            if created {
                if let Err(release_error) = QuotaService::release(store, quota, identity).await {
                    log::warn!(
                        "Failed to release quota slot for {}: {}",
                        identity,
                        release_error
                    );
                }
            }
            return Err(e);
        }

        log::info!(
            "{} configuration for form {} (active: {})",
            if created { "Created" } else { "Updated" },
            configuration.form_id,
            configuration.active
        );

        if !configuration.active {
            return Ok(SaveOutcome {
                configuration,
                created,
                applied: None,
            });
        }

        let applied = match Self::run_patch(store, gateway, retention, &configuration, now).await {
            Ok(result) => {
                configuration.last_run_at = Some(now);
                ApplyOutcome::Patched(result)
            }
            Err(e) => {
                log::error!(
                    "Immediate update of form {} failed: {}",
                    configuration.form_id,
                    e
                );
                ApplyOutcome::Failed(e.to_string())
            }
        };

        Ok(SaveOutcome {
            configuration,
            created,
            applied: Some(applied),
        })
    }

    /// Patches the form behind a stored configuration, bypassing the schedule
    pub async fn apply_now(
        store: &dyn KvStore,
        gateway: &dyn FormGateway,
        retention: &RetentionConfig,
        form_id: &str,
        credential: &str,
        now: DateTime<Utc>,
    ) -> AppResult<PatchResult> {
        let configuration = Self::get_authorized(store, form_id, credential).await?;
        if !configuration.active {
            return Err(AppError::Validation(format!(
                "Configuration for form {} has no enabled field rules",
                form_id
            )));
        }
        Self::run_patch(store, gateway, retention, &configuration, now).await
    }

    /// Runs the patcher and, on success, stamps `last_run_at`
    pub async fn run_patch(
        store: &dyn KvStore,
        gateway: &dyn FormGateway,
        retention: &RetentionConfig,
        configuration: &Configuration,
        now: DateTime<Utc>,
    ) -> AppResult<PatchResult> {
        let result = PatchService::apply(gateway, configuration, now).await?;

        if let Err(e) = Self::record_run(store, &configuration.form_id, now, retention).await {
            log::warn!(
                "Patched form {} but failed to record last run: {}",
                configuration.form_id,
                e
            );
        }

        Ok(result)
    }

    /// Re-reads the latest stored configuration and sets `last_run_at`
    async fn record_run(
        store: &dyn KvStore,
        form_id: &str,
        now: DateTime<Utc>,
        retention: &RetentionConfig,
    ) -> AppResult<()> {
        if let Some(mut latest) = Self::get(store, form_id).await? {
            latest.last_run_at = Some(now);
            Self::persist(store, &latest, retention).await?;
        }
        Ok(())
    }
}

use chrono::{DateTime, Timelike, Utc};

use crate::config::RetentionConfig;
use crate::error::AppResult;
use crate::models::{Configuration, RunMetadata};
use crate::store::{get_json, keys, put_json, KvStore};

/// Verdict of the per-tick gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// No actionable rule; never auto-updated
    Inactive,
    /// Already decided to run in this local (date, hour)
    AlreadyHandled,
    /// Run now and persist the carried metadata first
    Due(RunMetadata),
}

impl ScheduleDecision {
    pub fn is_due(&self) -> bool {
        matches!(self, ScheduleDecision::Due(_))
    }
}

/// Decides whether `config` should be patched during the tick at `now`.
///
/// Pure: the caller persists the metadata carried by `Due` before patching,
/// so a failed patch is retried from the next local hour, not this one.
pub fn is_due(
    config: &Configuration,
    metadata: Option<&RunMetadata>,
    now: DateTime<Utc>,
) -> ScheduleDecision {
    if !config.active {
        return ScheduleDecision::Inactive;
    }

    let local = now.with_timezone(&config.timezone);
    let candidate = RunMetadata {
        last_update_hour: local.hour(),
        last_update_date: local.date_naive(),
    };

    match metadata {
        Some(previous) if *previous == candidate => ScheduleDecision::AlreadyHandled,
        _ => ScheduleDecision::Due(candidate),
    }
}

pub struct ScheduleService;

impl ScheduleService {
    /// Reads run metadata; an expired entry reads as absent
    pub async fn load_metadata(
        store: &dyn KvStore,
        form_id: &str,
    ) -> AppResult<Option<RunMetadata>> {
        Ok(get_json(store, &keys::metadata_key(form_id)).await?)
    }

    pub async fn record_metadata(
        store: &dyn KvStore,
        form_id: &str,
        metadata: &RunMetadata,
        retention: &RetentionConfig,
    ) -> AppResult<()> {
        put_json(
            store,
            &keys::metadata_key(form_id),
            metadata,
            Some(retention.metadata_ttl),
        )
        .await?;
        Ok(())
    }

    /// Loads metadata, decides, and records the new metadata when due
    pub async fn decide_and_record(
        store: &dyn KvStore,
        config: &Configuration,
        now: DateTime<Utc>,
        retention: &RetentionConfig,
    ) -> AppResult<ScheduleDecision> {
        if !config.active {
            return Ok(ScheduleDecision::Inactive);
        }

        let metadata = Self::load_metadata(store, &config.form_id).await?;
        let decision = is_due(config, metadata.as_ref(), now);

        if let ScheduleDecision::Due(next) = &decision {
            Self::record_metadata(store, &config.form_id, next, retention).await?;
        }

        Ok(decision)
    }
}

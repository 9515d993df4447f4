use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::{RetentionConfig, TickConfig};
use crate::error::AppResult;
use crate::gateway::{FormGateway, SharedGateway};
use crate::models::Configuration;
use crate::services::{ConfigurationService, PatchResult, ScheduleDecision, ScheduleService};
use crate::store::{KvStore, SharedStore};

/// What happened to one configuration during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Inactive,
    AlreadyHandled,
    Written(PatchResult),
    Unchanged,
    /// Patch failed; retried from the next local hour
    PatchFailed(String),
}

/// Counters for one pass, logged when the pass ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub total: usize,
    pub skipped: usize,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: &AppResult<TickOutcome>) {
        self.total += 1;
        match outcome {
            Ok(TickOutcome::Inactive) | Ok(TickOutcome::AlreadyHandled) => self.skipped += 1,
            Ok(TickOutcome::Written(_)) => self.written += 1,
            Ok(TickOutcome::Unchanged) => self.unchanged += 1,
            Ok(TickOutcome::PatchFailed(_)) | Err(_) => self.failed += 1,
        }
    }
}

/// Processes one configuration: gate, record metadata, patch.
///
/// The metadata is written before the patch so an overlapping tick in the
/// same local hour sees the configuration as handled. Store errors are
/// returned; gateway errors become `PatchFailed`.
pub async fn process_configuration(
    store: &dyn KvStore,
    gateway: &dyn FormGateway,
    retention: &RetentionConfig,
    config: &Configuration,
    now: DateTime<Utc>,
) -> AppResult<TickOutcome> {
    match ScheduleService::decide_and_record(store, config, now, retention).await? {
        ScheduleDecision::Inactive => return Ok(TickOutcome::Inactive),
        ScheduleDecision::AlreadyHandled => return Ok(TickOutcome::AlreadyHandled),
        ScheduleDecision::Due(_) => {}
    }

    match ConfigurationService::run_patch(store, gateway, retention, config, now).await {
        Ok(result) if result.written => Ok(TickOutcome::Written(result)),
        Ok(_) => Ok(TickOutcome::Unchanged),
        Err(e) => Ok(TickOutcome::PatchFailed(e.to_string())),
    }
}

/// One full pass over every stored configuration.
///
/// Configurations are independent, so up to `concurrency` run at once. A
/// failure is logged and never stops the pass.
pub async fn run_tick(
    store: &dyn KvStore,
    gateway: &dyn FormGateway,
    retention: &RetentionConfig,
    concurrency: usize,
    now: DateTime<Utc>,
) -> AppResult<TickSummary> {
    let configurations = ConfigurationService::list(store).await?;
    log::info!("Tick started: {} configuration(s)", configurations.len());

    let outcomes: Vec<(String, AppResult<TickOutcome>)> = stream::iter(configurations)
        .map(|config| async move {
            let outcome = process_configuration(store, gateway, retention, &config, now).await;
            (config.form_id, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .boxed()
        .collect()
        .await;

    let mut summary = TickSummary::default();
    for (form_id, outcome) in &outcomes {
        match outcome {
            Ok(TickOutcome::Inactive) => log::debug!("Form {}: inactive, skipped", form_id),
            Ok(TickOutcome::AlreadyHandled) => {
                log::debug!("Form {}: already handled this hour", form_id)
            }
            Ok(TickOutcome::Written(result)) => log::info!(
                "Form {}: updated {} field(s)",
                form_id,
                result.changed_fields.len()
            ),
            Ok(TickOutcome::Unchanged) => log::info!("Form {}: already up to date", form_id),
            Ok(TickOutcome::PatchFailed(e)) => log::error!("Form {}: update failed: {}", form_id, e),
            Err(e) => log::error!("Form {}: skipped after store error: {}", form_id, e),
        }
        summary.record(outcome);
    }

    log::info!(
        "Tick finished: {} total, {} written, {} unchanged, {} skipped, {} failed",
        summary.total,
        summary.written,
        summary.unchanged,
        summary.skipped,
        summary.failed
    );

    Ok(summary)
}

/// Spawns the driving tick loop.
///
/// The first pass runs immediately; missed ticks are skipped rather than
/// replayed. Expired store entries are purged after every pass. Flipping
/// `shutdown` to true stops the loop, dropping any pass in flight;
/// configurations not yet reached stay pending for the next run.
pub fn spawn_tick_loop(
    store: SharedStore,
    gateway: SharedGateway,
    clock: Arc<dyn Clock>,
    retention: RetentionConfig,
    tick: TickConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!(
            "Tick loop started (interval: {}s, concurrency: {})",
            tick.interval.as_secs(),
            tick.concurrency
        );

        let mut interval = tokio::time::interval(tick.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            let pass = async {
                let now = clock.now();
                if let Err(e) =
                    run_tick(store.as_ref(), gateway.as_ref(), &retention, tick.concurrency, now)
                        .await
                {
                    log::error!("Tick aborted: {}", e);
                }

                match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => log::debug!("Purged {} expired store entries", purged),
                    Err(e) => log::warn!("Failed to purge expired entries: {}", e),
                }
            };

            tokio::select! {
                _ = pass => {}
                _ = shutdown.changed() => {
                    log::info!("Tick interrupted by shutdown");
                    break;
                }
            }
        }

        log::info!("Tick loop stopped");
    })
}

use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::gateway::FormGateway;
use crate::models::{Configuration, FormDefinition, FormUpdate};
use crate::services::date_limits::compute_boundary;

/// Outcome of one patch attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchResult {
    /// Whether an update was sent to the form service
    pub written: bool,
    /// Ids of the date fields whose boundaries changed
    pub changed_fields: Vec<String>,
}

/// Update to send, along with the ids it changes
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub update: FormUpdate,
    pub changed_fields: Vec<String>,
}

/// Diffs the freshly read form against the configured rules.
///
/// Returns `None` when no boundary differs from the current remote value.
/// Otherwise the update carries every date field as read, with only the
/// differing attributes replaced.
pub fn plan_update(
    form: &FormDefinition,
    config: &Configuration,
    now: DateTime<Utc>,
) -> Option<PlannedUpdate> {
    let mut changed_fields = Vec::new();

    let fields = form
        .date_fields()
        .map(|field| {
            let mut field = field.clone();

            let Some(rule) = config.fields.get(&field.id).filter(|r| r.is_actionable()) else {
                return field;
            };

            let mut changed = false;

            if let Some(offset) = rule.min_days {
                let candidate = compute_boundary(now, config.timezone, offset);
                if field.min_date.as_deref() != Some(candidate.as_str()) {
                    field.min_date = Some(candidate);
                    changed = true;
                }
            }

            if let Some(offset) = rule.max_days {
                let candidate = compute_boundary(now, config.timezone, offset);
                if field.max_date.as_deref() != Some(candidate.as_str()) {
                    field.max_date = Some(candidate);
                    changed = true;
                }
            }

            if changed {
                changed_fields.push(field.id.clone());
            }

            field
        })
        .collect::<Vec<_>>();

    if changed_fields.is_empty() {
        return None;
    }

    Some(PlannedUpdate {
        update: FormUpdate { fields },
        changed_fields,
    })
}

pub struct PatchService;

impl PatchService {
    /// Reads the form, diffs, and writes once if anything changed.
    ///
    /// Read and write failures are returned as errors; nothing is retried.
    pub async fn apply(
        gateway: &dyn FormGateway,
        config: &Configuration,
        now: DateTime<Utc>,
    ) -> AppResult<PatchResult> {
        let form = gateway.get_form(&config.credential, &config.form_id).await?;

        let Some(planned) = plan_update(&form, config, now) else {
            log::debug!("Form {} already up to date", config.form_id);
            return Ok(PatchResult::default());
        };

        gateway
            .update_form(&config.credential, &config.form_id, &planned.update)
            .await?;

        log::info!(
            "Updated date limits on form {} (fields: {})",
            config.form_id,
            planned.changed_fields.join(", ")
        );

        Ok(PatchResult {
            written: true,
            changed_fields: planned.changed_fields,
        })
    }
}

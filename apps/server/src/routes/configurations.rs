use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::{BearerCredential, RequesterIdentity};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{ConfigurationResponse, SaveConfiguration};
use crate::services::{ApplyOutcome, ConfigurationService, PatchResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PatchReport {
    pub written: bool,
    pub changed_fields: Vec<String>,
}

impl From<PatchResult> for PatchReport {
    fn from(result: PatchResult) -> Self {
        Self {
            written: result.written,
            changed_fields: result.changed_fields,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub configuration: ConfigurationResponse,
    pub created: bool,
    /// Present when the immediate update succeeded
    pub applied: Option<PatchReport>,
    /// Present when the immediate update failed; the save itself stands
    pub apply_error: Option<String>,
}

/// POST /api/configurations - Create or replace a configuration
pub async fn save_configuration(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    identity: RequesterIdentity,
    body: web::Json<SaveConfiguration>,
) -> AppResult<HttpResponse> {
    let outcome = ConfigurationService::save(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &config.quota,
        &config.retention,
        &identity.0,
        body.into_inner(),
        state.clock.now(),
    )
    .await?;

    let (applied, apply_error) = match outcome.applied {
        Some(ApplyOutcome::Patched(result)) => (Some(result.into()), None),
        Some(ApplyOutcome::Failed(e)) => (None, Some(e)),
        None => (None, None),
    };

    let response = SaveResponse {
        configuration: outcome.configuration.to_response(),
        created: outcome.created,
        applied,
        apply_error,
    };

    if outcome.created {
        Ok(HttpResponse::Created().json(response))
    } else {
        Ok(HttpResponse::Ok().json(response))
    }
}

/// GET /api/configurations/{form_id} - Get a stored configuration
///
/// The caller must present the configuration's credential as Bearer token.
pub async fn get_configuration(
    state: web::Data<AppState>,
    credential: BearerCredential,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let form_id = path.into_inner();
    let configuration =
        ConfigurationService::get_authorized(state.store.as_ref(), &form_id, &credential.0).await?;

    Ok(HttpResponse::Ok().json(configuration.to_response()))
}

/// POST /api/configurations/{form_id}/apply - Update the form now
pub async fn apply_configuration(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    credential: BearerCredential,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let form_id = path.into_inner();
    let result = ConfigurationService::apply_now(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &config.retention,
        &form_id,
        &credential.0,
        state.clock.now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(PatchReport::from(result)))
}

/// Configure configuration routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/configurations")
            .route("", web::post().to(save_configuration))
            .route("/{form_id}", web::get().to(get_configuration))
            .route("/{form_id}/apply", web::post().to(apply_configuration)),
    );
}

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::{BearerCredential, RequesterIdentity};
use crate::config::Config;
use crate::error::AppResult;
use crate::services::{ConfigurationService, QuotaService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FormListItem {
    pub id: String,
    pub title: Option<String>,
    /// A configuration is stored for this form
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct FormListResponse {
    pub forms: Vec<FormListItem>,
    /// The caller may still create a new configuration today
    pub quota_available: bool,
}

/// GET /api/forms - Forms visible to the caller's credential
///
/// Pre-flights the quota without consuming it, so a caller out of quota
/// learns before building a new configuration. Existing configurations stay
/// listed and editable either way.
pub async fn list_forms(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    credential: BearerCredential,
    identity: RequesterIdentity,
) -> AppResult<HttpResponse> {
    let quota_available =
        QuotaService::check_only(state.store.as_ref(), &config.quota, &identity.0).await?;

    let forms = state.gateway.list_forms(&credential.0).await?;

    let mut items = Vec::with_capacity(forms.len());
    for form in forms {
        let configured = ConfigurationService::get(state.store.as_ref(), &form.id)
            .await?
            .is_some();
        items.push(FormListItem {
            id: form.id,
            title: form.title,
            configured,
        });
    }

    Ok(HttpResponse::Ok().json(FormListResponse {
        forms: items,
        quota_available,
    }))
}

/// Configure form routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/forms").route("", web::get().to(list_forms)));
}

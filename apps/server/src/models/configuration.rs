use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest accepted day offset in either direction
pub const MAX_OFFSET_DAYS: i64 = 36_500;

/// Day-offset bounds for one date field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_days: Option<i64>,
    #[serde(default)]
    pub max_days: Option<i64>,
}

impl FieldRule {
    /// True when the patcher is allowed to touch this field
    pub fn is_actionable(&self) -> bool {
        self.enabled && (self.min_days.is_some() || self.max_days.is_some())
    }
}

/// Stored configuration for one managed form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub form_id: String,
    /// Bearer token for the form service. Never logged or returned.
    pub credential: String,
    pub timezone: Tz,
    /// Keyed by remote field id
    pub fields: BTreeMap<String, FieldRule>,
    pub active: bool,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    /// At least one rule would be written by the patcher
    pub fn compute_active(fields: &BTreeMap<String, FieldRule>) -> bool {
        fields.values().any(FieldRule::is_actionable)
    }

    pub fn to_response(&self) -> ConfigurationResponse {
        ConfigurationResponse {
            form_id: self.form_id.clone(),
            timezone: self.timezone.name().to_string(),
            fields: self.fields.clone(),
            active: self.active,
            last_run_at: self.last_run_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DTO for creating or replacing a configuration. Every field is optional
/// at the serde level so missing values surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveConfiguration {
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRule>,
}

/// Configuration as exposed over HTTP (no credential)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationResponse {
    pub form_id: String,
    pub timezone: String,
    pub fields: BTreeMap<String, FieldRule>,
    pub active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

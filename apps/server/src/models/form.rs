use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field type whose boundaries this service manages
pub const DATE_FIELD_TYPE: &str = "date";

/// Entry of the "list forms" response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Form definition as returned by the form service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// One field of a remote form.
///
/// Attributes this service does not know about are kept in `extra` and
/// written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Earliest selectable date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    /// Latest selectable date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormField {
    pub fn is_date(&self) -> bool {
        self.field_type == DATE_FIELD_TYPE
    }
}

impl FormDefinition {
    pub fn date_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| f.is_date())
    }
}

/// Body of the partial update call. The form service requires the full
/// collection of date fields even when only one attribute changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormUpdate {
    pub fields: Vec<FormField>,
}

pub mod configuration;
pub mod form;
pub mod metadata;

pub use configuration::{
    Configuration, ConfigurationResponse, FieldRule, SaveConfiguration, MAX_OFFSET_DAYS,
};
pub use form::{FormDefinition, FormField, FormSummary, FormUpdate, DATE_FIELD_TYPE};
pub use metadata::RunMetadata;

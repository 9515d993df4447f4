//! Client side of the external form service.
//!
//! The service is reached through the [`FormGateway`] trait so the patcher
//! and the tick can run against an in-memory fake.

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{FormDefinition, FormSummary, FormUpdate};

pub use http::HttpFormGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Authenticated operations consumed from the form service
#[async_trait]
pub trait FormGateway: Send + Sync {
    /// Forms visible to the credential
    async fn list_forms(&self, credential: &str) -> Result<Vec<FormSummary>, GatewayError>;

    /// Latest form definition, never cached
    async fn get_form(&self, credential: &str, form_id: &str)
        -> Result<FormDefinition, GatewayError>;

    /// Partial update carrying the field collection
    async fn update_form(
        &self,
        credential: &str,
        form_id: &str,
        update: &FormUpdate,
    ) -> Result<(), GatewayError>;
}

pub type SharedGateway = Arc<dyn FormGateway>;

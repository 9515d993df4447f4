use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::{FormGateway, GatewayError};
use crate::config::GatewayConfig;
use crate::models::{FormDefinition, FormSummary, FormUpdate};

/// JSON-over-HTTP form service client with bearer authentication
pub struct HttpFormGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFormGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("Invalid base URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// `{base}/forms[/{form_id}]`, with the id percent-encoded as one segment
    fn forms_url(&self, form_id: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                GatewayError::InvalidRequest("Base URL cannot have path segments".to_string())
            })?;
            segments.pop_if_empty().push("forms");
            if let Some(id) = form_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Transport("Request timed out".to_string())
            } else if e.is_connect() {
                GatewayError::Transport("Connection failed".to_string())
            } else {
                GatewayError::Transport(format!("Request failed: {}", e))
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let error_body = response.text().await.unwrap_or_default();
        let message = if error_body.is_empty() {
            "no response body".to_string()
        } else {
            error_body
        };
        Err(GatewayError::Status { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FormGateway for HttpFormGateway {
    async fn list_forms(&self, credential: &str) -> Result<Vec<FormSummary>, GatewayError> {
        let url = self.forms_url(None)?;
        let response = Self::send(self.client.get(url).bearer_auth(credential)).await?;
        Self::decode(response).await
    }

    async fn get_form(
        &self,
        credential: &str,
        form_id: &str,
    ) -> Result<FormDefinition, GatewayError> {
        let url = self.forms_url(Some(form_id))?;
        let response = Self::send(self.client.get(url).bearer_auth(credential)).await?;
        Self::decode(response).await
    }

    async fn update_form(
        &self,
        credential: &str,
        form_id: &str,
        update: &FormUpdate,
    ) -> Result<(), GatewayError> {
        let url = self.forms_url(Some(form_id))?;
        Self::send(self.client.patch(url).bearer_auth(credential).json(update)).await?;
        Ok(())
    }
}

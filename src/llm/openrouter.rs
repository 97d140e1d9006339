//! OpenRouter client
//!
//! OpenRouter exposes many providers' models behind one OpenAI-compatible
//! chat completions API. The same client also works against the local
//! forwarding proxy (`panelcmp serve`), which speaks the same contract.
//!
//! SECURITY: the API key is only sent to the configured endpoints and is
//! never logged.

use super::{ChatRequest, ChatResponse, LlmBackend, LlmError, ModelEntry, ModelsResponse};
use crate::config::UpstreamConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// OpenRouter (or compatible) HTTP client
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    chat_url: String,
    models_url: String,
    /// Custom headers to send with requests
    custom_headers: Vec<(String, String)>,
}

impl OpenRouterClient {
    pub fn new(chat_url: impl Into<String>, models_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            chat_url: chat_url.into(),
            models_url: models_url.into(),
            custom_headers: Vec::new(),
        }
    }

    /// Build a client from the `[upstream]` config section
    pub fn from_config(config: &UpstreamConfig) -> Self {
        let mut client = Self::new(&config.chat_url, &config.models_url);
        if let Some(ref site_url) = config.site_url {
            client = client.with_header("HTTP-Referer", site_url);
        }
        if let Some(ref app_name) = config.app_name {
            client = client.with_header("X-Title", app_name);
        }
        client
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Attach bearer auth and custom headers
    fn authorize(&self, mut req: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        req = req.header("Authorization", format!("Bearer {}", api_key));
        for (name, value) in &self.custom_headers {
            req = req.header(name, value);
        }
        req
    }

    /// Read a response, classifying non-success statuses from the body
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LlmError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(LlmError::from_network_error)?;

        if !status.is_success() {
            tracing::debug!(target: "llm", %status, "Upstream returned an error body");
            return Err(LlmError::from_response_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmBackend for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelEntry>, LlmError> {
        tracing::debug!(target: "llm", url = %self.models_url, "Fetching model list");

        let response = self
            .authorize(self.client.get(&self.models_url), api_key)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        let listing: ModelsResponse = Self::read_json(response).await?;
        let entries = listing.into_entries();
        tracing::debug!(target: "llm", count = entries.len(), "Model list received");
        Ok(entries)
    }

    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        tracing::debug!(
            target: "llm",
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .authorize(self.client.post(&self.chat_url), api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        Self::read_json(response).await
    }
}

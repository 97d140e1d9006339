//! Upstream LLM access: wire types, typed errors, and the backend seam

mod error;
mod openrouter;
mod types;

pub use error::{extract_error_message, LlmError, GENERIC_REQUEST_FAILURE};
pub use openrouter::OpenRouterClient;
pub use types::*;

use async_trait::async_trait;

/// The two upstream collaborators the store talks to
///
/// Implementations never see store state: they get the API key and a fully
/// built request and report either a parsed body or a typed error.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name (for logs)
    fn name(&self) -> &str;

    /// List the models selectable with this key
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelEntry>, LlmError>;

    /// Send one non-streaming chat completion request
    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

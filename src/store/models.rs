//! Model directory: the selectable models for the current API key

use crate::llm::{LlmError, ModelEntry};
use serde::{Deserialize, Serialize};

/// Shown when a listing failure carries no upstream message
pub const MODELS_FETCH_FAILED: &str = "Failed to fetch models";

/// A selectable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
}

impl From<ModelEntry> for Model {
    fn from(entry: ModelEntry) -> Self {
        let name = entry
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| entry.id.clone());
        Self { id: entry.id, name }
    }
}

/// Map upstream entries to models sorted by name, ignoring case
pub fn normalize_models(entries: Vec<ModelEntry>) -> Vec<Model> {
    let mut models: Vec<Model> = entries.into_iter().map(Model::from).collect();
    models.sort_by_cached_key(|m| m.name.to_lowercase());
    models
}

/// Text recorded on `models_error` for a failed listing
pub fn models_error_message(err: &LlmError) -> String {
    match err.body_message().map(str::trim) {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => match err {
            LlmError::Network(_) | LlmError::Timeout(_) | LlmError::MalformedResponse(_) => {
                format!("{}: {}", MODELS_FETCH_FAILED, err)
            }
            _ => MODELS_FETCH_FAILED.to_string(),
        },
    }
}

/// Display name for a model id, if the directory knows it
pub fn model_name<'a>(models: &'a [Model], model_id: &str) -> Option<&'a str> {
    models
        .iter()
        .find(|m| m.id == model_id)
        .map(|m| m.name.as_str())
}

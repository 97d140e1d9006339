//! Panel store: the owning controller for comparison state
//!
//! `AppState` holds the data and applies every mutation atomically.
//! `PanelStore` pairs it with an upstream backend and runs the two
//! asynchronous operations, the model directory fetch and the fan-out.
//! Async work only ever carries panel ids and settles through `AppState`,
//! never through a captured copy of a panel.

mod models;
mod panel;
mod state;

pub use models::{model_name, models_error_message, normalize_models, Model, MODELS_FETCH_FAILED};
pub use panel::{display_order, next_panel_id, Panel, PanelUpdate};
pub use state::{AppState, StateSnapshot};

use crate::llm::{LlmBackend, LlmError};
use futures::future::join_all;
use state::PanelJob;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for one upstream request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How a fan-out went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl FanOutSummary {
    /// Nothing was sent (a precondition was not met)
    pub fn is_noop(&self) -> bool {
        self.dispatched == 0
    }
}

/// Comparison state plus the upstream it talks to
#[derive(Clone)]
pub struct PanelStore {
    state: AppState,
    backend: Arc<dyn LlmBackend>,
    request_timeout: Duration,
}

impl PanelStore {
    pub fn new(state: AppState, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            state,
            backend,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The underlying state, for reads
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    // ========== Synchronous operations ==========

    pub fn set_api_key(&self, key: impl Into<String>) {
        self.state.set_api_key(key);
    }

    pub fn set_system_prompt(&self, text: impl Into<String>) {
        self.state.set_system_prompt(text);
    }

    pub fn set_query(&self, text: impl Into<String>) {
        self.state.set_query(text);
    }

    pub fn add_panel(&self) -> String {
        self.state.add_panel()
    }

    pub fn remove_panel(&self, id: &str) -> bool {
        self.state.remove_panel(id)
    }

    pub fn update_panel(&self, id: &str, update: PanelUpdate) -> bool {
        self.state.update_panel(id, update)
    }

    pub fn reorder_panels<S: AsRef<str>>(&self, ids: &[S]) {
        self.state.reorder_panels(ids);
    }

    pub fn move_panel(&self, from_id: &str, to_id: &str) -> bool {
        self.state.move_panel(from_id, to_id)
    }

    pub fn toggle_pinned(&self, id: &str) -> bool {
        self.state.toggle_pinned(id)
    }

    pub fn toggle_active(&self, id: &str) -> bool {
        self.state.toggle_active(id)
    }

    pub fn set_panel_model(&self, id: &str, model_id: Option<&str>) -> bool {
        self.state.set_panel_model(id, model_id)
    }

    pub fn clear_all_conversations(&self) {
        self.state.clear_all_conversations();
    }

    // ========== Model directory ==========

    /// Refresh the model directory for the current API key
    ///
    /// No-op without a key. On failure the previous list stays and
    /// `models_error` is set. A result that a newer fetch superseded is
    /// dropped.
    pub async fn fetch_models(&self) {
        let Some((token, api_key)) = self.state.begin_models_fetch() else {
            return;
        };

        let result = match tokio::time::timeout(
            self.request_timeout,
            self.backend.list_models(&api_key),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.request_timeout)),
        };

        let outcome = match result {
            Ok(entries) => {
                let models = normalize_models(entries);
                tracing::info!(count = models.len(), "Model directory refreshed");
                Ok(models)
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), "Model listing failed: {}", e);
                Err(models_error_message(&e))
            }
        };
        self.state.finish_models_fetch(token, outcome);
    }

    // ========== Fan-out ==========

    /// Send the current query to every active panel with a model
    ///
    /// All panels get the user message and go into loading before any
    /// request is issued. Requests then run concurrently and each settles
    /// its own panel. Completes once every request has settled; failures
    /// are recorded on panels, never returned.
    pub async fn send_to_all(&self) -> FanOutSummary {
        let Some(fan_out) = self.state.begin_fan_out() else {
            tracing::debug!("Fan-out skipped: missing key, query, or active panel");
            return FanOutSummary::default();
        };

        let dispatched = fan_out.jobs.len();
        tracing::info!(panels = dispatched, "Dispatching query");

        let api_key = fan_out.api_key;
        let outcomes = join_all(
            fan_out
                .jobs
                .into_iter()
                .map(|job| self.run_job(&api_key, job)),
        )
        .await;

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        FanOutSummary {
            dispatched,
            succeeded,
            failed: dispatched - succeeded,
        }
    }

    /// One panel's request, start to settlement
    async fn run_job(&self, api_key: &str, job: PanelJob) -> bool {
        let PanelJob { panel_id, request } = job;

        let result = match tokio::time::timeout(
            self.request_timeout,
            self.backend.chat(api_key, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.request_timeout)),
        };

        match result {
            Ok(response) => {
                tracing::debug!(panel = %panel_id, model = %request.model, "Panel settled");
                self.state.settle_panel(&panel_id, Ok(response.reply_text()));
                true
            }
            Err(e) => {
                tracing::warn!(
                    panel = %panel_id,
                    model = %request.model,
                    "Panel request failed: {}",
                    e
                );
                self.state.settle_panel(&panel_id, Err(e.panel_message()));
                false
            }
        }
    }
}

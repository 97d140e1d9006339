//! Panel entity: one model slot with its own transcript and request status

use crate::llm::Message;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static PANEL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a panel id from a process-wide counter and the current time
///
/// The counter keeps ids distinct within a millisecond; the timestamp keeps
/// them distinct from ids minted in earlier sessions.
pub fn next_panel_id() -> String {
    let n = PANEL_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("panel-{}-{}", n, chrono::Utc::now().timestamp_millis())
}

/// One model slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: String,
    pub model_id: Option<String>,
    pub is_active: bool,
    pub is_pinned: bool,
    pub conversation_history: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Panel {
    /// A fresh panel: no model, active, unpinned, empty transcript
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model_id: None,
            is_active: true,
            is_pinned: false,
            conversation_history: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    /// Eligible for the next fan-out
    pub fn is_dispatchable(&self) -> bool {
        self.is_active && self.model_id.is_some()
    }

    /// Last transcript entry, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.conversation_history.last()
    }

    /// Merge the fields set in `update`, leaving the rest untouched
    pub fn apply(&mut self, update: PanelUpdate) {
        if let Some(model_id) = update.model_id {
            self.model_id = model_id;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(is_pinned) = update.is_pinned {
            self.is_pinned = is_pinned;
        }
        if let Some(is_loading) = update.is_loading {
            self.is_loading = is_loading;
        }
        if let Some(error) = update.error {
            self.error = error;
        }
    }

    /// Empty the transcript and reset request status
    pub fn reset_conversation(&mut self) {
        self.conversation_history.clear();
        self.is_loading = false;
        self.error = None;
    }
}

/// Partial panel update; `None` leaves a field as it is
///
/// The transcript is deliberately absent: it only grows through the
/// dispatcher or is wiped by `clear_all_conversations`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelUpdate {
    pub model_id: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_pinned: Option<bool>,
    pub is_loading: Option<bool>,
    pub error: Option<Option<String>>,
}

impl PanelUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a model; an empty id clears the selection
    pub fn model(mut self, model_id: Option<impl Into<String>>) -> Self {
        let model_id: Option<String> = model_id.map(Into::into).filter(|m| !m.is_empty());
        self.model_id = Some(model_id);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn pinned(mut self, is_pinned: bool) -> Self {
        self.is_pinned = Some(is_pinned);
        self
    }

    pub fn loading(mut self, is_loading: bool) -> Self {
        self.is_loading = Some(is_loading);
        self
    }

    pub fn error(mut self, error: Option<impl Into<String>>) -> Self {
        self.error = Some(error.map(Into::into));
        self
    }
}

/// Pinned panels first, store order preserved within each group
pub fn display_order(panels: &[Panel]) -> Vec<Panel> {
    let mut sorted = panels.to_vec();
    sorted.sort_by_key(|p| !p.is_pinned);
    sorted
}

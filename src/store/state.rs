//! Shared application state
//!
//! Thread-safe state shared between the dispatcher and whatever front end
//! reads it. Every mutation runs under one short write lock, so readers only
//! ever observe whole transitions. The lock is never held across an await.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use super::models::Model;
use super::panel::{display_order, next_panel_id, Panel, PanelUpdate};
use crate::llm::{ChatRequest, Message};
use crate::storage::{PersistedPanel, PersistedState, SnapshotSink};

/// Read-only copy of the whole state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub api_key: String,
    pub system_prompt: String,
    pub query: String,
    pub panels: Vec<Panel>,
    pub models: Vec<Model>,
    pub models_loading: bool,
    pub models_error: Option<String>,
}

/// Shared application state (thread-safe)
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<StateInner>>,
    persister: Option<Arc<Persister>>,
}

#[derive(Debug, Default)]
struct StateInner {
    api_key: String,
    system_prompt: String,
    query: String,
    panels: Vec<Panel>,

    models: Vec<Model>,
    models_loading: bool,
    models_error: Option<String>,
    /// Token of the latest model listing request; older results are dropped
    models_token: u64,
    /// Bumped by every persisted mutation
    generation: u64,
}

/// Orders snapshot writes: a snapshot older than the last one written is dropped
struct Persister {
    sink: Arc<dyn SnapshotSink>,
    written: Mutex<u64>,
}

impl Persister {
    fn new(sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            sink,
            written: Mutex::new(0),
        }
    }

    fn save(&self, generation: u64, snapshot: &PersistedState) {
        let mut written = self.written.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Snapshot writer lock was poisoned, recovering");
            poisoned.into_inner()
        });
        if generation <= *written {
            tracing::debug!(generation, latest = *written, "Skipping superseded snapshot");
            return;
        }
        if let Err(e) = self.sink.save(snapshot) {
            tracing::warn!("Failed to persist state: {:#}", e);
        }
        *written = generation;
    }
}

/// One planned request produced by the synchronous fan-out phase
#[derive(Debug, Clone)]
pub(crate) struct PanelJob {
    pub panel_id: String,
    pub request: ChatRequest,
}

/// Everything the asynchronous fan-out phase needs
#[derive(Debug, Clone)]
pub(crate) struct FanOut {
    pub api_key: String,
    pub jobs: Vec<PanelJob>,
}

impl StateInner {
    fn has_panel(&self, id: &str) -> bool {
        self.panels.iter().any(|p| p.id == id)
    }

    fn panel_mut(&mut self, id: &str) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id == id)
    }

    fn unique_panel_id(&self) -> String {
        loop {
            let id = next_panel_id();
            if !self.has_panel(&id) {
                return id;
            }
        }
    }

    fn persisted(&self) -> PersistedState {
        PersistedState::new(
            self.system_prompt.clone(),
            self.panels.iter().map(PersistedPanel::from).collect(),
        )
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("panels", &self.read_inner().panels.len())
            .field("persistent", &self.persister.is_some())
            .finish()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Fresh state with exactly one default panel
    pub fn new() -> Self {
        let mut inner = StateInner::default();
        let id = inner.unique_panel_id();
        inner.panels.push(Panel::new(id));
        Self::from_inner(inner)
    }

    /// Rehydrate from a stored snapshot, or start fresh without one
    ///
    /// Loading flags and errors always come back cleared. Duplicate panel ids
    /// in the snapshot keep their first occurrence.
    pub fn from_persisted(persisted: Option<PersistedState>) -> Self {
        let Some(persisted) = persisted else {
            return Self::new();
        };

        let mut inner = StateInner {
            system_prompt: persisted.system_prompt,
            ..Default::default()
        };
        for panel in persisted.panels {
            if inner.has_panel(&panel.id) {
                tracing::warn!(id = %panel.id, "Dropping duplicate panel from snapshot");
                continue;
            }
            inner.panels.push(Panel::from(panel));
        }
        Self::from_inner(inner)
    }

    fn from_inner(inner: StateInner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inner)),
            persister: None,
        }
    }

    /// Mirror every mutation into `sink`
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.persister = Some(Arc::new(Persister::new(sink)));
        self
    }

    // ========== Private Helpers ==========

    /// Get a read lock on the inner state, recovering from poison
    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("AppState read lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Get a write lock on the inner state, recovering from poison
    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("AppState write lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Apply one atomic mutation, then hand a snapshot to the sink
    ///
    /// The snapshot is taken under the write lock and stamped with a
    /// generation; the write itself happens after the lock is released, so
    /// readers never wait on disk. The save is synchronous on the calling
    /// thread, including async settle paths; a single small file write.
    fn mutate<R>(&self, f: impl FnOnce(&mut StateInner) -> R) -> R {
        let (result, pending) = {
            let mut inner = self.write_inner();
            let result = f(&mut inner);
            let pending = self.persister.as_ref().map(|_| {
                inner.generation += 1;
                (inner.generation, inner.persisted())
            });
            (result, pending)
        };

        if let (Some(persister), Some((generation, snapshot))) = (self.persister.as_ref(), pending) {
            persister.save(generation, &snapshot);
        }
        result
    }

    // ========== Getters ==========

    pub fn api_key(&self) -> String {
        self.read_inner().api_key.clone()
    }

    pub fn system_prompt(&self) -> String {
        self.read_inner().system_prompt.clone()
    }

    pub fn query(&self) -> String {
        self.read_inner().query.clone()
    }

    /// Panels in store order
    pub fn panels(&self) -> Vec<Panel> {
        self.read_inner().panels.clone()
    }

    /// Panels in display order (pinned first)
    pub fn display_panels(&self) -> Vec<Panel> {
        display_order(&self.read_inner().panels)
    }

    pub fn panel(&self, id: &str) -> Option<Panel> {
        self.read_inner().panels.iter().find(|p| p.id == id).cloned()
    }

    pub fn panel_ids(&self) -> Vec<String> {
        self.read_inner().panels.iter().map(|p| p.id.clone()).collect()
    }

    pub fn panel_count(&self) -> usize {
        self.read_inner().panels.len()
    }

    pub fn models(&self) -> Vec<Model> {
        self.read_inner().models.clone()
    }

    pub fn models_loading(&self) -> bool {
        self.read_inner().models_loading
    }

    pub fn models_error(&self) -> Option<String> {
        self.read_inner().models_error.clone()
    }

    /// Display name of a model from the directory
    pub fn model_name(&self, model_id: &str) -> Option<String> {
        super::models::model_name(&self.read_inner().models, model_id).map(str::to_string)
    }

    /// Whether a send has both a key and a query to work with
    pub fn can_send(&self) -> bool {
        let inner = self.read_inner();
        !inner.api_key.trim().is_empty() && !inner.query.trim().is_empty()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.read_inner();
        StateSnapshot {
            api_key: inner.api_key.clone(),
            system_prompt: inner.system_prompt.clone(),
            query: inner.query.clone(),
            panels: inner.panels.clone(),
            models: inner.models.clone(),
            models_loading: inner.models_loading,
            models_error: inner.models_error.clone(),
        }
    }

    /// The persistable subset of the current state
    pub fn persisted(&self) -> PersistedState {
        self.read_inner().persisted()
    }

    // ========== Settings ==========

    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.mutate(|inner| inner.api_key = key);
    }

    pub fn set_system_prompt(&self, text: impl Into<String>) {
        let text = text.into();
        self.mutate(|inner| inner.system_prompt = text);
    }

    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.mutate(|inner| inner.query = text);
    }

    // ========== Panels ==========

    /// Append a fresh panel and return its id
    pub fn add_panel(&self) -> String {
        self.mutate(|inner| {
            let id = inner.unique_panel_id();
            inner.panels.push(Panel::new(id.clone()));
            id
        })
    }

    /// Remove a panel; returns false when the id is unknown
    pub fn remove_panel(&self, id: &str) -> bool {
        self.mutate(|inner| {
            let before = inner.panels.len();
            inner.panels.retain(|p| p.id != id);
            inner.panels.len() != before
        })
    }

    /// Merge `update` into a panel; returns false when the id is unknown
    pub fn update_panel(&self, id: &str, update: PanelUpdate) -> bool {
        self.mutate(|inner| match inner.panel_mut(id) {
            Some(panel) => {
                panel.apply(update);
                true
            }
            None => false,
        })
    }

    /// Set the store order to `ids`
    ///
    /// Unknown ids are skipped and panels missing from `ids` are dropped, so
    /// callers pass the full id set.
    pub fn reorder_panels<S: AsRef<str>>(&self, ids: &[S]) {
        self.mutate(|inner| {
            let mut remaining = std::mem::take(&mut inner.panels);
            let mut reordered = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(pos) = remaining.iter().position(|p| p.id == id.as_ref()) {
                    reordered.push(remaining.swap_remove(pos));
                }
            }
            if !remaining.is_empty() {
                tracing::debug!(dropped = remaining.len(), "Reorder dropped unlisted panels");
            }
            inner.panels = reordered;
        });
    }

    /// Drag `from_id` onto `to_id`'s slot in display order
    pub fn move_panel(&self, from_id: &str, to_id: &str) -> bool {
        if from_id == to_id {
            return false;
        }
        let mut order: Vec<String> = self.display_panels().into_iter().map(|p| p.id).collect();
        let (Some(from), Some(to)) = (
            order.iter().position(|id| id == from_id),
            order.iter().position(|id| id == to_id),
        ) else {
            return false;
        };
        let moved = order.remove(from);
        order.insert(to, moved);
        self.reorder_panels(&order);
        true
    }

    pub fn toggle_pinned(&self, id: &str) -> bool {
        self.mutate(|inner| match inner.panel_mut(id) {
            Some(panel) => {
                panel.is_pinned = !panel.is_pinned;
                true
            }
            None => false,
        })
    }

    pub fn toggle_active(&self, id: &str) -> bool {
        self.mutate(|inner| match inner.panel_mut(id) {
            Some(panel) => {
                panel.is_active = !panel.is_active;
                true
            }
            None => false,
        })
    }

    /// Select a model for a panel; `None` or an empty id clears it
    pub fn set_panel_model(&self, id: &str, model_id: Option<&str>) -> bool {
        self.update_panel(id, PanelUpdate::new().model(model_id))
    }

    pub fn clear_all_conversations(&self) {
        self.mutate(|inner| {
            for panel in &mut inner.panels {
                panel.reset_conversation();
            }
        });
    }

    // ========== Fan-out ==========

    /// Synchronous fan-out phase
    ///
    /// In one mutation: append the query to every dispatchable panel, mark
    /// them loading, clear their errors, then clear the query. Returns `None`
    /// (touching nothing) when the key, the query, or the active set is empty.
    pub(crate) fn begin_fan_out(&self) -> Option<FanOut> {
        self.mutate(|inner| {
            if inner.api_key.trim().is_empty() || inner.query.trim().is_empty() {
                return None;
            }
            if !inner.panels.iter().any(Panel::is_dispatchable) {
                return None;
            }

            let query = std::mem::take(&mut inner.query);
            let system_prompt = inner.system_prompt.clone();
            let mut jobs = Vec::new();

            for panel in inner.panels.iter_mut().filter(|p| p.is_dispatchable()) {
                panel.conversation_history.push(Message::user(query.clone()));
                panel.is_loading = true;
                panel.error = None;

                let mut messages = Vec::with_capacity(panel.conversation_history.len() + 1);
                if !system_prompt.trim().is_empty() {
                    messages.push(Message::user(system_prompt.clone()));
                }
                messages.extend(panel.conversation_history.iter().cloned());

                jobs.push(PanelJob {
                    panel_id: panel.id.clone(),
                    request: ChatRequest {
                        model: panel.model_id.clone().unwrap_or_default(),
                        messages,
                    },
                });
            }

            Some(FanOut {
                api_key: inner.api_key.clone(),
                jobs,
            })
        })
    }

    /// Record one panel's outcome against its current state
    ///
    /// Ok appends the assistant reply; Err records the message. Either way
    /// loading is cleared. Returns false if the panel is gone.
    pub(crate) fn settle_panel(&self, id: &str, outcome: Result<String, String>) -> bool {
        self.mutate(|inner| {
            let Some(panel) = inner.panel_mut(id) else {
                tracing::debug!(id, "Panel removed before its request settled");
                return false;
            };
            panel.is_loading = false;
            match outcome {
                Ok(reply) => {
                    panel.error = None;
                    panel.conversation_history.push(Message::assistant(reply));
                }
                Err(message) => panel.error = Some(message),
            }
            true
        })
    }

    // ========== Model directory ==========

    /// Start a listing request; returns its token and the key to use
    pub(crate) fn begin_models_fetch(&self) -> Option<(u64, String)> {
        self.mutate(|inner| {
            if inner.api_key.trim().is_empty() {
                return None;
            }
            inner.models_token += 1;
            inner.models_loading = true;
            inner.models_error = None;
            Some((inner.models_token, inner.api_key.clone()))
        })
    }

    /// Apply a listing result unless a newer request superseded it
    pub(crate) fn finish_models_fetch(&self, token: u64, result: Result<Vec<Model>, String>) -> bool {
        self.mutate(|inner| {
            if token != inner.models_token {
                tracing::debug!(token, latest = inner.models_token, "Discarding stale model list");
                return false;
            }
            inner.models_loading = false;
            match result {
                Ok(models) => inner.models = models,
                Err(message) => inner.models_error = Some(message),
            }
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        saves: Mutex<Vec<PersistedState>>,
    }

    impl SnapshotSink for RecordingSink {
        fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
            self.saves.lock().unwrap().push(state.clone());
            Ok(())
        }
    }

    fn ids(panels: &[Panel]) -> Vec<String> {
        panels.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_starts_with_one_default_panel() {
        let state = AppState::new();
        let panels = state.panels();
        assert_eq!(panels.len(), 1);
        assert!(panels[0].is_active);
        assert_eq!(panels[0].model_id, None);
        assert_eq!(state.api_key(), "");
        assert_eq!(state.query(), "");
    }

    #[test]
    fn test_settings_accept_anything() {
        let state = AppState::new();
        state.set_api_key("sk-or-123");
        state.set_system_prompt("Be terse.");
        state.set_query("  ");
        assert_eq!(state.api_key(), "sk-or-123");
        assert_eq!(state.system_prompt(), "Be terse.");
        assert_eq!(state.query(), "  ");
        assert!(!state.can_send());

        state.set_query("hi");
        assert!(state.can_send());
        state.set_api_key("");
        assert!(!state.can_send());
    }

    #[test]
    fn test_add_and_remove() {
        let state = AppState::new();
        let a = state.add_panel();
        let b = state.add_panel();
        assert_eq!(state.panel_count(), 3);
        assert_ne!(a, b);

        assert!(state.remove_panel(&a));
        assert!(!state.remove_panel(&a));
        assert!(!state.remove_panel("missing"));
        assert_eq!(state.panel_count(), 2);
        assert!(state.panel(&b).is_some());
    }

    #[test]
    fn test_update_unknown_panel_is_noop() {
        let state = AppState::new();
        let before = state.panels();
        assert!(!state.update_panel("missing", PanelUpdate::new().pinned(true)));
        assert_eq!(state.panels(), before);
    }

    #[test]
    fn test_reorder_drops_unknown_and_unlisted() {
        let state = AppState::new();
        let first = state.panel_ids()[0].clone();
        let b = state.add_panel();
        let c = state.add_panel();

        state.reorder_panels(&[c.clone(), "ghost".to_string(), first.clone()]);
        assert_eq!(state.panel_ids(), vec![c, first]);
        assert!(state.panel(&b).is_none());
    }

    #[test]
    fn test_move_panel_uses_display_order() {
        let state = AppState::new();
        let a = state.panel_ids()[0].clone();
        let b = state.add_panel();
        let c = state.add_panel();
        state.toggle_pinned(&c);

        // display: [c, a, b]; drag b onto c's slot
        assert!(state.move_panel(&b, &c));
        assert_eq!(ids(&state.panels()), vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(ids(&state.display_panels()), vec![c, b, a]);
    }

    #[test]
    fn test_move_panel_noops() {
        let state = AppState::new();
        let a = state.panel_ids()[0].clone();
        assert!(!state.move_panel(&a, &a));
        assert!(!state.move_panel(&a, "ghost"));
        assert_eq!(state.panel_ids(), vec![a]);
    }

    #[test]
    fn test_toggles_and_model_selection() {
        let state = AppState::new();
        let id = state.panel_ids()[0].clone();

        assert!(state.toggle_active(&id));
        assert!(!state.panel(&id).unwrap().is_active);
        assert!(state.toggle_pinned(&id));
        assert!(state.panel(&id).unwrap().is_pinned);
        assert!(state.set_panel_model(&id, Some("m1")));
        assert_eq!(state.panel(&id).unwrap().model_id.as_deref(), Some("m1"));
        assert!(state.set_panel_model(&id, Some("")));
        assert_eq!(state.panel(&id).unwrap().model_id, None);
        assert!(!state.toggle_active("ghost"));
    }

    #[test]
    fn test_begin_fan_out_preconditions() {
        let state = AppState::new();
        let id = state.panel_ids()[0].clone();
        state.set_panel_model(&id, Some("m1"));

        state.set_query("hello");
        assert!(state.begin_fan_out().is_none(), "no key");

        state.set_api_key("key");
        state.set_query("   ");
        assert!(state.begin_fan_out().is_none(), "blank query");

        state.set_query("hello");
        state.toggle_active(&id);
        assert!(state.begin_fan_out().is_none(), "nothing active");
        assert_eq!(state.query(), "hello");
        assert!(state.panel(&id).unwrap().conversation_history.is_empty());
    }

    #[test]
    fn test_begin_fan_out_builds_requests() {
        let state = AppState::new();
        let a = state.panel_ids()[0].clone();
        let b = state.add_panel();
        let idle = state.add_panel();
        state.set_panel_model(&a, Some("m1"));
        state.set_panel_model(&b, Some("m2"));
        state.set_api_key("key");
        state.set_system_prompt("Be terse.");
        state.set_query("hello");

        let fan_out = state.begin_fan_out().unwrap();
        assert_eq!(fan_out.api_key, "key");
        assert_eq!(fan_out.jobs.len(), 2);
        assert_eq!(state.query(), "");

        let job = &fan_out.jobs[0];
        assert_eq!(job.panel_id, a);
        assert_eq!(job.request.model, "m1");
        assert_eq!(
            job.request.messages,
            vec![Message::user("Be terse."), Message::user("hello")]
        );

        let panel = state.panel(&b).unwrap();
        assert!(panel.is_loading);
        assert_eq!(panel.last_message(), Some(&Message::user("hello")));
        assert!(state.panel(&idle).unwrap().conversation_history.is_empty());
    }

    #[test]
    fn test_settle_appends_to_current_transcript() {
        let state = AppState::new();
        let id = state.panel_ids()[0].clone();
        state.set_panel_model(&id, Some("m1"));
        state.set_api_key("key");
        state.set_query("one");
        state.begin_fan_out().unwrap();

        state.clear_all_conversations();
        assert!(state.settle_panel(&id, Ok("late".to_string())));
        assert_eq!(
            state.panel(&id).unwrap().conversation_history,
            vec![Message::assistant("late")]
        );

        assert!(state.remove_panel(&id));
        assert!(!state.settle_panel(&id, Err("gone".to_string())));
    }

    #[test]
    fn test_stale_models_fetch_is_discarded() {
        let state = AppState::new();
        assert!(state.begin_models_fetch().is_none());

        state.set_api_key("key");
        let (first, _) = state.begin_models_fetch().unwrap();
        let (second, key) = state.begin_models_fetch().unwrap();
        assert_eq!(key, "key");
        assert!(second > first);

        let fresh = vec![Model {
            id: "new".to_string(),
            name: "New".to_string(),
        }];
        assert!(state.finish_models_fetch(second, Ok(fresh.clone())));
        assert!(!state.finish_models_fetch(first, Err("slow failure".to_string())));
        assert_eq!(state.models(), fresh);
        assert_eq!(state.models_error(), None);
        assert!(!state.models_loading());
    }

    #[test]
    fn test_every_mutation_reaches_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new().with_sink(sink.clone());

        state.set_system_prompt("sys");
        let id = state.add_panel();
        state.update_panel(&id, PanelUpdate::new().loading(true).error(Some("x")));

        let saves = sink.saves.lock().unwrap();
        assert_eq!(saves.len(), 3);
        let last = saves.last().unwrap();
        assert_eq!(last.system_prompt, "sys");
        assert_eq!(last.panels.len(), 2);
        assert!(last.panels.iter().all(|p| !p.is_loading && p.error.is_none()));
    }

    /// Sink that is slow for one particular system prompt
    #[derive(Default)]
    struct SlowSink {
        last: Mutex<Option<String>>,
    }

    impl SnapshotSink for SlowSink {
        fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
            if state.system_prompt == "old" {
                std::thread::sleep(Duration::from_millis(200));
            }
            *self.last.lock().unwrap() = Some(state.system_prompt.clone());
            Ok(())
        }
    }

    #[test]
    fn test_slow_save_does_not_overwrite_newer_snapshot() {
        let sink = Arc::new(SlowSink::default());
        let state = AppState::new().with_sink(sink.clone());

        let writer = {
            let state = state.clone();
            std::thread::spawn(move || state.set_system_prompt("old"))
        };
        std::thread::sleep(Duration::from_millis(50));
        state.set_system_prompt("new");
        writer.join().unwrap();

        assert_eq!(state.system_prompt(), "new");
        assert_eq!(sink.last.lock().unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_superseded_snapshot_is_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let persister = Persister::new(sink.clone());

        let newer = PersistedState::new("new".to_string(), Vec::new());
        let older = PersistedState::new("old".to_string(), Vec::new());
        persister.save(2, &newer);
        persister.save(1, &older);
        persister.save(2, &older);

        let saves = sink.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].system_prompt, "new");
    }

    #[test]
    fn test_clear_all_conversations_keeps_panel_settings() {
        let state = AppState::new();
        let a = state.panel_ids()[0].clone();
        let b = state.add_panel();
        let c = state.add_panel();
        state.set_panel_model(&a, Some("m/a"));
        state.set_panel_model(&b, Some("m/b"));
        state.set_panel_model(&c, Some("m/c"));
        state.toggle_pinned(&b);
        state.set_api_key("k");
        state.set_query("hello");
        state.begin_fan_out().unwrap();
        state.settle_panel(&a, Ok("reply".to_string()));
        state.settle_panel(&b, Err("boom".to_string()));
        // c stays in flight
        state.toggle_active(&b);

        let before = state.panels();
        state.clear_all_conversations();
        let after = state.panels();

        assert_eq!(after.len(), 3);
        for (old, new) in before.iter().zip(after.iter()) {
            assert_eq!(old.id, new.id);
            assert_eq!(old.model_id, new.model_id);
            assert_eq!(old.is_active, new.is_active);
            assert_eq!(old.is_pinned, new.is_pinned);
            assert!(new.conversation_history.is_empty());
            assert!(!new.is_loading);
            assert_eq!(new.error, None);
        }
        assert!(before[2].is_loading);
        assert_eq!(before[1].error.as_deref(), Some("boom"));
        assert!(!after[1].is_active && after[1].is_pinned);
        assert!(after[0].is_active && !after[0].is_pinned);
    }
}

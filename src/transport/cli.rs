//! CLI transport: headless commands over the persisted workspace

use crate::config::Config;
use crate::llm::{OpenRouterClient, Role};
use crate::storage::StateStorage;
use crate::store::{AppState, Panel, PanelStore};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

/// Open the persisted workspace with an upstream client attached
///
/// The API key is never read from storage; it comes from the caller.
pub fn open_store(config: &Config, api_key: Option<String>) -> Result<PanelStore> {
    let storage = StateStorage::from_config(&config.storage)?;
    tracing::debug!("Workspace snapshot: {}", storage.path().display());

    let state = AppState::from_persisted(storage.load()).with_sink(Arc::new(storage));
    if let Some(key) = api_key {
        state.set_api_key(key);
    }

    let backend = Arc::new(OpenRouterClient::from_config(&config.upstream));
    Ok(PanelStore::new(state, backend).with_request_timeout(config.upstream.request_timeout()))
}

/// Resolve a panel by 1-based display position or by id
pub fn resolve_panel(store: &PanelStore, selector: &str) -> Result<String> {
    let panels = store.state().display_panels();

    if let Ok(position) = selector.parse::<usize>() {
        return panels
            .get(position.wrapping_sub(1))
            .map(|p| p.id.clone())
            .with_context(|| format!("No panel at position {}", position));
    }

    panels
        .iter()
        .find(|p| p.id == selector)
        .map(|p| p.id.clone())
        .with_context(|| format!("No panel with id '{}'", selector))
}

fn model_label(store: &PanelStore, panel: &Panel) -> String {
    match panel.model_id {
        Some(ref id) => store.state().model_name(id).unwrap_or_else(|| id.clone()),
        None => "(no model)".to_string(),
    }
}

fn flag(on: bool) -> String {
    let text = if on { "yes" } else { "-" };
    text.to_string()
}

/// List panels in display order
pub fn run_panels(store: &PanelStore) -> Result<()> {
    #[derive(Tabled)]
    struct PanelRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Id")]
        id: String,
        #[tabled(rename = "Model")]
        model: String,
        #[tabled(rename = "Active")]
        active: String,
        #[tabled(rename = "Pinned")]
        pinned: String,
        #[tabled(rename = "Messages")]
        messages: usize,
    }

    let rows: Vec<PanelRow> = store
        .state()
        .display_panels()
        .iter()
        .enumerate()
        .map(|(i, p)| PanelRow {
            position: i + 1,
            id: p.id.clone(),
            model: model_label(store, p),
            active: flag(p.is_active),
            pinned: flag(p.is_pinned),
            messages: p.conversation_history.len(),
        })
        .collect();

    if rows.is_empty() {
        println!("No panels. Add one with `panelcmp add`.");
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

pub fn run_add(store: &PanelStore, model: Option<&str>) -> Result<()> {
    let id = store.add_panel();
    if let Some(model) = model {
        store.set_panel_model(&id, Some(model));
    }
    println!("Added {}", id.bold());
    Ok(())
}

pub fn run_remove(store: &PanelStore, selector: &str) -> Result<()> {
    let id = resolve_panel(store, selector)?;
    store.remove_panel(&id);
    println!("Removed {}", id);
    Ok(())
}

pub fn run_set_model(store: &PanelStore, selector: &str, model: Option<&str>) -> Result<()> {
    let id = resolve_panel(store, selector)?;
    store.set_panel_model(&id, model);
    match model.filter(|m| !m.is_empty()) {
        Some(model) => println!("{} -> {}", id, model.bold()),
        None => println!("{} model cleared", id),
    }
    Ok(())
}

pub fn run_toggle_pin(store: &PanelStore, selector: &str) -> Result<()> {
    let id = resolve_panel(store, selector)?;
    store.toggle_pinned(&id);
    let pinned = store.state().panel(&id).map(|p| p.is_pinned).unwrap_or(false);
    println!("{} {}", id, if pinned { "pinned" } else { "unpinned" });
    Ok(())
}

pub fn run_toggle_active(store: &PanelStore, selector: &str) -> Result<()> {
    let id = resolve_panel(store, selector)?;
    store.toggle_active(&id);
    let active = store.state().panel(&id).map(|p| p.is_active).unwrap_or(false);
    println!("{} {}", id, if active { "active" } else { "inactive" });
    Ok(())
}

pub fn run_reorder(store: &PanelStore, selectors: &[String]) -> Result<()> {
    let ids = selectors
        .iter()
        .map(|s| resolve_panel(store, s))
        .collect::<Result<Vec<_>>>()?;
    if ids.len() != store.state().panel_count() {
        bail!(
            "Reorder needs every panel ({} given, {} exist)",
            ids.len(),
            store.state().panel_count()
        );
    }
    store.reorder_panels(&ids);
    run_panels(store)
}

pub fn run_prompt(store: &PanelStore, text: &str) -> Result<()> {
    store.set_system_prompt(text);
    if text.trim().is_empty() {
        println!("System prompt cleared");
    } else {
        println!("System prompt set ({} chars)", text.chars().count());
    }
    Ok(())
}

pub fn run_clear(store: &PanelStore) -> Result<()> {
    store.clear_all_conversations();
    println!("Cleared all conversations");
    Ok(())
}

/// Print the effective configuration, optionally writing the defaults first
pub fn run_config(config: &Config, path: Option<&Path>, init: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if init {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        Config::default().save_to(&path)?;
        println!("Wrote {}", path.display().to_string().green());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn require_api_key(store: &PanelStore) -> Result<()> {
    if store.state().api_key().trim().is_empty() {
        bail!("No API key: pass --api-key or set OPENROUTER_API_KEY");
    }
    Ok(())
}

/// Fetch and print the model directory
pub async fn run_models(store: &PanelStore, format: &str, filter: Option<&str>) -> Result<()> {
    require_api_key(store)?;
    store.fetch_models().await;

    if let Some(error) = store.state().models_error() {
        bail!("Model listing failed: {}", error);
    }

    let needle = filter.map(str::to_lowercase);
    let models: Vec<_> = store
        .state()
        .models()
        .into_iter()
        .filter(|m| match needle {
            Some(ref n) => m.id.to_lowercase().contains(n) || m.name.to_lowercase().contains(n),
            None => true,
        })
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&models)?),
        _ => {
            #[derive(Tabled)]
            struct ModelRow {
                #[tabled(rename = "Id")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
            }

            let rows: Vec<ModelRow> = models
                .into_iter()
                .map(|m| ModelRow {
                    id: m.id,
                    name: m.name,
                })
                .collect();
            let count = rows.len();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
            println!("{} models", count);
        }
    }
    Ok(())
}

/// Fan a query out and print every panel's outcome
pub async fn run_send(store: &PanelStore, query: &str) -> Result<()> {
    require_api_key(store)?;
    store.set_query(query);

    let summary = store.send_to_all().await;
    if summary.is_noop() {
        if query.trim().is_empty() {
            bail!("Query is empty");
        }
        bail!("No active panel has a model; use `panelcmp model <panel> <model>`");
    }

    for panel in store
        .state()
        .display_panels()
        .iter()
        .filter(|p| p.is_dispatchable())
    {
        println!("\n{}", format!("=== {} ===", model_label(store, panel)).bold().cyan());
        match (&panel.error, panel.last_message()) {
            (Some(error), _) => println!("{}", error.red()),
            (None, Some(msg)) if msg.role == Role::Assistant => println!("{}", msg.content),
            _ => println!("{}", "(no reply)".dimmed()),
        }
    }

    println!(
        "\n{} sent, {} answered, {} failed",
        summary.dispatched, summary.succeeded, summary.failed
    );
    Ok(())
}

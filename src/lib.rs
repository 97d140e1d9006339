//! panelcmp: side-by-side comparison of LLM replies
//!
//! This library provides:
//! - A panel store that fans one query out to several models and keeps a
//!   per-panel transcript
//! - An OpenRouter-compatible upstream client and model directory
//! - A durable snapshot of the workspace (system prompt and panels)
//! - A forwarding proxy and a headless CLI over the same store

pub mod config;
pub mod llm;
pub mod storage;
pub mod store;
pub mod transport;

pub use config::Config;
pub use llm::{LlmBackend, LlmError, OpenRouterClient};
pub use storage::StateStorage;
pub use store::{AppState, FanOutSummary, Model, Panel, PanelStore, PanelUpdate};

//! Durable snapshot of the comparison workspace
//!
//! One named slot on disk:
//!
//! ~/.local/share/panelcmp/           # dirs::data_dir()/panelcmp
//! └── llm-comparison-storage.json    # system prompt + panels
//!
//! The API key is never written; it is re-entered every session. Loading
//! flags and errors are written as constants and ignored on load, so a
//! restart never shows a stale in-flight or failed state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::llm::Message;
use crate::store::Panel;

/// Name of the storage slot
pub const STORAGE_SLOT: &str = "llm-comparison-storage";

/// Application data directory name
const APP_DIR: &str = "panelcmp";

/// Current snapshot layout
const SNAPSHOT_VERSION: u32 = 1;

fn default_true() -> bool {
    true
}

/// The persistable subset of the application state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub panels: Vec<PersistedPanel>,
}

impl PersistedState {
    pub fn new(system_prompt: String, panels: Vec<PersistedPanel>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            system_prompt,
            panels,
        }
    }
}

/// Stored form of a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPanel {
    pub id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    /// Always written as false
    #[serde(default)]
    pub is_loading: bool,
    /// Always written as null
    #[serde(default)]
    pub error: Option<String>,
}

impl From<&Panel> for PersistedPanel {
    fn from(panel: &Panel) -> Self {
        Self {
            id: panel.id.clone(),
            model_id: panel.model_id.clone(),
            is_active: panel.is_active,
            is_pinned: panel.is_pinned,
            conversation_history: panel.conversation_history.clone(),
            is_loading: false,
            error: None,
        }
    }
}

impl From<PersistedPanel> for Panel {
    fn from(stored: PersistedPanel) -> Self {
        Self {
            id: stored.id,
            model_id: stored.model_id.filter(|m| !m.is_empty()),
            is_active: stored.is_active,
            is_pinned: stored.is_pinned,
            conversation_history: stored.conversation_history,
            is_loading: false,
            error: None,
        }
    }
}

/// Receives a snapshot after every state mutation
pub trait SnapshotSink: Send + Sync {
    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// File-backed snapshot slot
#[derive(Debug, Clone)]
pub struct StateStorage {
    path: PathBuf,
}

impl StateStorage {
    /// Storage at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage at the configured path, or the default data directory
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.path {
            Some(ref path) => Ok(Self::new(path)),
            None => Ok(Self::new(Self::default_path()?)),
        }
    }

    /// `<data dir>/panelcmp/llm-comparison-storage.json`
    pub fn default_path() -> Result<PathBuf> {
        let root = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .context("No data directory available")?;
        Ok(root.join(APP_DIR).join(format!("{}.json", STORAGE_SLOT)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot
    ///
    /// Absent or unreadable data yields `None`; callers start from the
    /// default state instead of failing.
    pub fn load(&self) -> Option<PersistedState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<PersistedState>(&content) {
            Ok(state) => {
                if state.version > SNAPSHOT_VERSION {
                    tracing::warn!(
                        "Snapshot version {} is newer than supported {}, reading best effort",
                        state.version,
                        SNAPSHOT_VERSION
                    );
                }
                Some(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt snapshot at {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Write the snapshot atomically (temp file + rename)
    pub fn write(&self, state: &PersistedState) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let content = serde_json::to_string_pretty(state)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl SnapshotSink for StateStorage {
    fn save(&self, state: &PersistedState) -> Result<()> {
        self.write(state)
    }
}

//! Per-model view state persistence.
//!
//! Everything the viewer remembers about a model between sessions lives in
//! one [`ViewState`] record keyed by model id. Writers send partial
//! [`ViewStatePatch`]es; untouched fields keep their stored values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use explodeview_camera::CameraState;
use explodeview_core::Result;

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the per-model assistant conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A reply from the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Stored state for one model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    /// Last camera pose, absent until the user has viewed the model.
    pub camera: Option<CameraState>,
    /// Explode slider value as a 0-100 percentage.
    pub explode_value: f32,
    /// Free-form user notes.
    pub notes: String,
    /// Assistant conversation.
    pub chat_history: Vec<ChatMessage>,
    /// Ids of parts selected for inspection.
    pub selected_parts: Vec<String>,
}

impl ViewState {
    /// Applies a partial update.
    pub fn apply(&mut self, patch: ViewStatePatch) {
        if let Some(camera) = patch.camera {
            self.camera = Some(camera);
        }
        if let Some(explode_value) = patch.explode_value {
            self.explode_value = explode_value;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(chat_history) = patch.chat_history {
            self.chat_history = chat_history;
        }
        if let Some(selected_parts) = patch.selected_parts {
            self.selected_parts = selected_parts;
        }
    }
}

/// A partial update to a [`ViewState`]. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewStatePatch {
    pub camera: Option<CameraState>,
    pub explode_value: Option<f32>,
    pub notes: Option<String>,
    pub chat_history: Option<Vec<ChatMessage>>,
    pub selected_parts: Option<Vec<String>>,
}

impl ViewStatePatch {
    /// Patch carrying only a camera pose.
    #[must_use]
    pub fn camera(camera: CameraState) -> Self {
        Self {
            camera: Some(camera),
            ..Self::default()
        }
    }

    /// Patch carrying only an explode value (percent).
    #[must_use]
    pub fn explode_value(value: f32) -> Self {
        Self {
            explode_value: Some(value),
            ..Self::default()
        }
    }
}

/// Key-value persistence for view state, keyed by model id.
pub trait ViewStateStore {
    /// Reads the stored state for a model, `None` if nothing was stored.
    fn get(&self, model_id: &str) -> Result<Option<ViewState>>;

    /// Merges a partial update into the stored state for a model.
    fn set(&mut self, model_id: &str, patch: ViewStatePatch) -> Result<()>;
}

impl<T: ViewStateStore + ?Sized> ViewStateStore for &mut T {
    fn get(&self, model_id: &str) -> Result<Option<ViewState>> {
        (**self).get(model_id)
    }

    fn set(&mut self, model_id: &str, patch: ViewStatePatch) -> Result<()> {
        (**self).set(model_id, patch)
    }
}

impl<T: ViewStateStore + ?Sized> ViewStateStore for Box<T> {
    fn get(&self, model_id: &str) -> Result<Option<ViewState>> {
        (**self).get(model_id)
    }

    fn set(&mut self, model_id: &str, patch: ViewStatePatch) -> Result<()> {
        (**self).set(model_id, patch)
    }
}

/// In-process store; contents are lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    states: HashMap<String, ViewState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of models with stored state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl ViewStateStore for MemoryStore {
    fn get(&self, model_id: &str) -> Result<Option<ViewState>> {
        Ok(self.states.get(model_id).cloned())
    }

    fn set(&mut self, model_id: &str, patch: ViewStatePatch) -> Result<()> {
        self.states
            .entry(model_id.to_string())
            .or_default()
            .apply(patch);
        Ok(())
    }
}

/// Store keeping one JSON file per model in a directory.
///
/// Survives process restarts. A corrupt file is reported by [`get`] and
/// replaced on the next [`set`].
///
/// [`get`]: ViewStateStore::get
/// [`set`]: ViewStateStore::set
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(default_store_dir())
    }

    /// The directory holding the state files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for a model.
    #[must_use]
    pub fn path_for(&self, model_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_file_stem(model_id)))
    }
}

impl ViewStateStore for JsonFileStore {
    fn get(&self, model_id: &str) -> Result<Option<ViewState>> {
        let path = self.path_for(model_id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn set(&mut self, model_id: &str, patch: ViewStatePatch) -> Result<()> {
        let mut state = match self.get(model_id) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                log::warn!("discarding unreadable view state for '{model_id}': {e}");
                ViewState::default()
            }
        };
        state.apply(patch);

        let path = self.path_for(model_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&state)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Default directory for persisted view state.
#[must_use]
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("explodeview")
        .join("state")
}

/// Maps a model id onto a safe, distinct file stem.
///
/// Lowercase ASCII letters, digits and `-` pass through. Every other byte is
/// written as `_` plus two lowercase hex digits, so distinct ids never share
/// a file, even on case-insensitive file systems.
fn sanitize_file_stem(model_id: &str) -> String {
    use std::fmt::Write as _;

    if model_id.is_empty() {
        return "_".to_string();
    }
    let mut stem = String::with_capacity(model_id.len());
    for byte in model_id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "_{byte:02x}");
        }
    }
    stem
}

//! Model catalog loaded from a directory of JSON documents.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use explodeview_core::{ExplodeViewError, Model, Options, Result, SceneGraph};

use crate::persistence::ViewStateStore;
use crate::session::ViewerSession;

/// Listing entry for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub model_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub part_count: usize,
    pub node_count: usize,
}

/// The set of models available for viewing, keyed by model id.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    models: BTreeMap<String, Model>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` document in `dir`.
    ///
    /// Documents that fail to parse or validate are skipped with a warning so
    /// one broken model does not hide the rest. Only an unreadable directory
    /// is an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            match Model::from_json_file(&path).and_then(|m| catalog.insert(m)) {
                Ok(()) => {}
                Err(e) => log::warn!("skipping model {}: {e}", path.display()),
            }
        }
        log::info!("loaded {} models from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    /// Adds a model after validating its node tree.
    ///
    /// A model with an id already in the catalog replaces the old entry.
    pub fn insert(&mut self, model: Model) -> Result<()> {
        SceneGraph::from_model(&model)?;
        if let Some(old) = self.models.insert(model.model_id.clone(), model) {
            log::debug!("replaced model '{}'", old.model_id);
        }
        Ok(())
    }

    /// Number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Looks up a model by id.
    pub fn get(&self, model_id: &str) -> Result<&Model> {
        self.models
            .get(model_id)
            .ok_or_else(|| ExplodeViewError::ModelNotFound(model_id.to_string()))
    }

    /// Summaries of all models, sorted by id.
    #[must_use]
    pub fn list(&self) -> Vec<ModelSummary> {
        self.models
            .values()
            .map(|m| ModelSummary {
                model_id: m.model_id.clone(),
                title: m.title.clone(),
                thumbnail_url: m.thumbnail_url.clone(),
                part_count: m.parts.len(),
                node_count: m.nodes.len(),
            })
            .collect()
    }

    /// Opens a viewing session for a catalog model.
    pub fn open<S: ViewStateStore>(
        &self,
        model_id: &str,
        store: S,
        options: Options,
    ) -> Result<ViewerSession<S>> {
        ViewerSession::open(self.get(model_id)?.clone(), store, options)
    }
}

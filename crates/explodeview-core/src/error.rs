//! Error types for explodeview.

use thiserror::Error;

/// The main error type for explodeview operations.
#[derive(Error, Debug)]
pub enum ExplodeViewError {
    /// A node with the given id was not found.
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// A part with the given id was not found.
    #[error("part '{0}' not found")]
    PartNotFound(String),

    /// A model with the given id was not found.
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// Two nodes in one model share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// Two parts in one model share an id.
    #[error("duplicate part id '{0}'")]
    DuplicatePart(String),

    /// A node references a parent that does not exist.
    #[error("node '{node}' references unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    /// A node references a part that does not exist.
    #[error("node '{node}' references unknown part '{part}'")]
    UnknownPart { node: String, part: String },

    /// Following parent references from this node loops back on itself.
    #[error("cyclic parent hierarchy through node '{0}'")]
    CyclicHierarchy(String),

    /// A transform in the document contains non-finite values.
    #[error("invalid transform on node '{node}': {reason}")]
    InvalidTransform { node: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for explodeview operations.
pub type Result<T> = std::result::Result<T, ExplodeViewError>;

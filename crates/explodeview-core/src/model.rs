//! Scene input documents: models, parts and nodes.
//!
//! A model document is a JSON object with camelCase keys:
//!
//! ```json
//! {
//!   "modelId": "v4-engine",
//!   "title": "V4 Engine",
//!   "parts": [{ "partId": "piston", "displayNameKo": "피스톤", "glbUrl": "/m/piston.glb", "summary": "" }],
//!   "nodes": [{
//!     "nodeId": "piston-1", "partId": "piston", "parentNodeId": null,
//!     "assembled": { "pos": [0, 1, 0], "quat": [0, 0, 0, 1], "scale": [1, 1, 1] },
//!     "explode": { "dir": [0, 1, 0], "distance": 2.0 }
//!   }]
//! }
//! ```

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transform::Transform;

/// An assembly model: metadata plus its part catalog and node tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub model_id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub theory: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Model {
    /// Parses a model document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a model document from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Looks up a part by id.
    #[must_use]
    pub fn part(&self, part_id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.part_id == part_id)
    }
}

/// A catalog entry describing one kind of part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub part_id: String,
    pub display_name_ko: String,
    pub glb_url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
}

/// An instance of a part placed in the assembly tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: String,
    pub part_id: String,
    #[serde(default)]
    pub parent_node_id: Option<String>,
    #[serde(default)]
    pub assembled: AssembledPose,
    #[serde(default)]
    pub explode: ExplodeSpec,
}

/// Pose of a node relative to its parent when fully assembled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssembledPose {
    #[serde(default)]
    pub pos: Vec3,
    #[serde(default = "identity_quat")]
    pub quat: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Default for AssembledPose {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            quat: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl AssembledPose {
    /// The pose as a [`Transform`].
    #[must_use]
    pub fn to_transform(&self) -> Transform {
        Transform::new(self.pos, self.quat, self.scale)
    }
}

/// How a node moves away from its assembled pose as the explode factor grows.
///
/// `dir` is expressed in the parent's local frame and is used as given.
/// `start` and `duration` stage the motion within the factor range: the node
/// begins moving at `start` and reaches its full offset at `start + duration`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplodeSpec {
    #[serde(default)]
    pub dir: Vec3,
    #[serde(default)]
    pub distance: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    /// Rotation reached when fully exploded, replacing the assembled rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quat: Option<Quat>,
    /// Scale reached when fully exploded, replacing the assembled scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
}

impl ExplodeSpec {
    /// A plain translation-only explode spec.
    #[must_use]
    pub fn along(dir: Vec3, distance: f32) -> Self {
        Self {
            dir,
            distance,
            ..Self::default()
        }
    }
}

fn identity_quat() -> Quat {
    Quat::IDENTITY
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

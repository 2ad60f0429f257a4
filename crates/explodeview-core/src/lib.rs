//! Core abstractions for explodeview.
//!
//! This crate provides the engine behind an interactive exploded-assembly viewer:
//! - [`Model`] documents describing parts and the node tree that places them
//! - [`SceneGraph`] for validated hierarchy and world-transform composition
//! - [`ExplodeDriver`] mapping an explode factor to per-node target transforms
//! - [`TransformInterpolator`] for frame-rate independent smoothing
//! - Configuration options and error types

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Exact float comparisons are intentional at the explode boundaries
#![allow(clippy::float_cmp)]

pub mod bounds;
pub mod error;
pub mod explode;
pub mod interpolate;
pub mod model;
pub mod options;
pub mod scene_graph;
pub mod transform;

pub use bounds::Aabb;
pub use error::{ExplodeViewError, Result};
pub use explode::{target_local, target_world, ExplodeDriver, ExplodeFactor};
pub use interpolate::{advance, TransformInterpolator, DEFAULT_DAMPING};
pub use model::{AssembledPose, ExplodeSpec, Model, Node, Part};
pub use options::{FramingOptions, Options};
pub use scene_graph::{NodeIndex, SceneGraph, SceneNode};
pub use transform::Transform;

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec3};

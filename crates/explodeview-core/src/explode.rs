//! Explode factor and per-node target transforms.
//!
//! A node's target local position is
//! `assembled.position + dir * (distance * g)`, where `g` is the explode
//! factor remapped into the node's `[start, start + duration]` stage window.
//! Without staging `g` is the factor itself.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ExplodeSpec;
use crate::scene_graph::{NodeIndex, SceneGraph};
use crate::transform::Transform;

/// Scalar in `[0, 1]` controlling how far apart parts are displayed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct ExplodeFactor(f32);

impl ExplodeFactor {
    /// Fully assembled.
    pub const ASSEMBLED: Self = Self(0.0);
    /// Fully exploded.
    pub const EXPLODED: Self = Self(1.0);

    /// Creates a factor, clamping into `[0, 1]`. NaN maps to 0.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Creates a factor from a 0-100 percentage.
    #[must_use]
    pub fn from_percent(percent: f32) -> Self {
        Self::new(percent / 100.0)
    }

    /// The factor in `[0, 1]`.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// The factor as a 0-100 percentage.
    #[must_use]
    pub fn percent(self) -> f32 {
        self.0 * 100.0
    }
}

/// Remaps the global factor into a node's stage window.
#[must_use]
pub fn staged_factor(spec: &ExplodeSpec, factor: ExplodeFactor) -> f32 {
    let f = factor.value();
    match (spec.start, spec.duration) {
        (None, None) => f,
        (start, duration) => {
            let start = start.unwrap_or(0.0);
            let duration = duration.unwrap_or(1.0 - start);
            if duration <= 0.0 {
                // Zero-length stage: jump once the start is reached.
                return if f >= start { 1.0 } else { 0.0 };
            }
            ((f - start) / duration).clamp(0.0, 1.0)
        }
    }
}

/// Computes a node's target local transform for an explode factor.
///
/// At a staged factor of 0, or with zero explode distance and no overrides,
/// the assembled transform is returned unchanged.
#[must_use]
pub fn target_local(assembled: &Transform, spec: &ExplodeSpec, factor: ExplodeFactor) -> Transform {
    let g = staged_factor(spec, factor);
    if g == 0.0 {
        return *assembled;
    }

    let mut target = *assembled;
    if spec.distance != 0.0 {
        target.translation = assembled.translation + spec.dir * (spec.distance * g);
    }
    if let Some(rotation) = spec.quat {
        target.rotation = if g >= 1.0 {
            rotation
        } else {
            assembled.rotation.slerp(rotation, g)
        };
    }
    if let Some(scale) = spec.scale {
        target.scale = if g >= 1.0 {
            scale
        } else {
            assembled.scale.lerp(scale, g)
        };
    }
    target
}

/// World pose of a node with every node on its chain at its target for `factor`.
///
/// Each child's offset is applied in its parent's exploded frame, so
/// sub-assemblies move together with their parent.
pub fn target_world(graph: &SceneGraph, node_id: &str, factor: ExplodeFactor) -> Result<Transform> {
    let index = graph.lookup(node_id)?;
    Ok(graph.world_with(index, |node| {
        target_local(node.assembled(), node.explode(), factor)
    }))
}

/// Maps the explode factor to target local transforms for every node.
///
/// Targets are cached and only recomputed after the factor changes.
#[derive(Debug, Clone)]
pub struct ExplodeDriver {
    factor: ExplodeFactor,
    targets: Vec<Transform>,
    dirty: bool,
}

impl ExplodeDriver {
    /// Creates a driver for a graph, starting at `factor`.
    #[must_use]
    pub fn new(graph: &SceneGraph, factor: ExplodeFactor) -> Self {
        let mut driver = Self {
            factor,
            targets: Vec::with_capacity(graph.len()),
            dirty: true,
        };
        driver.recompute(graph);
        driver
    }

    /// The current explode factor.
    #[must_use]
    pub fn factor(&self) -> ExplodeFactor {
        self.factor
    }

    /// Sets the explode factor. Returns whether it changed.
    pub fn set_factor(&mut self, factor: ExplodeFactor) -> bool {
        if factor == self.factor {
            return false;
        }
        self.factor = factor;
        self.dirty = true;
        true
    }

    /// Returns whether targets are stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes targets if the factor changed since the last computation.
    ///
    /// Returns whether a recomputation happened.
    pub fn update(&mut self, graph: &SceneGraph) -> bool {
        if !self.dirty {
            return false;
        }
        self.recompute(graph);
        true
    }

    /// Current targets, indexed by arena index.
    ///
    /// These may be stale if [`set_factor`](Self::set_factor) was called
    /// without a following [`update`](Self::update).
    #[must_use]
    pub fn targets(&self) -> &[Transform] {
        &self.targets
    }

    /// Target local transform of one node.
    #[must_use]
    pub fn target(&self, index: NodeIndex) -> &Transform {
        &self.targets[index.0]
    }

    fn recompute(&mut self, graph: &SceneGraph) {
        self.targets.clear();
        self.targets.extend(
            graph
                .nodes()
                .map(|(_, node)| target_local(node.assembled(), node.explode(), self.factor)),
        );
        self.dirty = false;
        log::trace!("explode targets recomputed at factor {}", self.factor.value());
    }
}

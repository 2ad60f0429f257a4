//! Auto-framing the camera around an assembly.
//!
//! Framing needs the world extents of every node, which are only known once
//! the external mesh loader has produced geometry. Until then a [`Framer`]
//! reports [`FramingStatus::Pending`] each frame; after its frame budget runs
//! out it falls back to a fixed default pose.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use explodeview_core::{Aabb, FramingOptions, Part, SceneGraph, SceneNode};

/// Source of per-node mesh extents, provided by the asset loader.
pub trait GeometrySource {
    /// Bounds of the node's mesh in the node's own local frame, or `None`
    /// while the mesh has not been loaded.
    fn local_bounds(&self, node: &SceneNode, part: &Part) -> Option<Aabb>;
}

/// A geometry source that gives every node the same local box.
///
/// Useful for headless runs where meshes are never loaded.
#[derive(Debug, Clone, Copy)]
pub struct UniformBounds(pub Aabb);

impl GeometrySource for UniformBounds {
    fn local_bounds(&self, _node: &SceneNode, _part: &Part) -> Option<Aabb> {
        Some(self.0)
    }
}

/// A geometry source for which nothing has loaded yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeometry;

impl GeometrySource for NoGeometry {
    fn local_bounds(&self, _node: &SceneNode, _part: &Part) -> Option<Aabb> {
        None
    }
}

/// Camera pose and orbit bounds that frame an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Framing {
    /// Camera position.
    pub position: Vec3,
    /// Look-at target.
    pub target: Vec3,
    /// Closest allowed orbit distance.
    pub min_distance: f32,
    /// Farthest allowed orbit distance.
    pub max_distance: f32,
}

impl Framing {
    /// Distance from the camera to its target.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Bounding box of the whole assembly in its assembled pose.
///
/// Returns `None` if the graph is empty or any node's geometry is missing.
pub fn assembly_bounds(graph: &SceneGraph, geometry: &dyn GeometrySource) -> Option<Aabb> {
    let world = graph.compose_world(&graph.assembled_locals());
    let mut bounds: Option<Aabb> = None;
    for (index, node) in graph.nodes() {
        let part = graph.node_part(index);
        let local = geometry.local_bounds(node, part)?;
        let moved = local.transformed(&world[index.0]);
        bounds = Some(bounds.map_or(moved, |b| b.union(moved)));
    }
    bounds.filter(Aabb::is_finite)
}

/// Unit vector from the target toward the camera for the configured view angles.
#[must_use]
pub fn view_direction(options: &FramingOptions) -> Vec3 {
    let elevation = options.elevation_deg.to_radians();
    let azimuth = options.azimuth_deg.to_radians();
    Vec3::new(
        elevation.cos() * azimuth.sin(),
        elevation.sin(),
        elevation.cos() * azimuth.cos(),
    )
}

/// Computes a framing for a bounding box.
///
/// Degenerate boxes (no extent in any direction) frame the box center with
/// the fallback distances.
#[must_use]
pub fn frame_bounds(bounds: &Aabb, options: &FramingOptions) -> Framing {
    let center = bounds.center();
    let max_dim = bounds.max_dimension();
    if !(max_dim.is_finite() && max_dim > 0.0) {
        let fallback = fallback_framing(options);
        let distance = fallback.distance();
        return Framing {
            position: center + view_direction(options) * distance,
            target: center,
            ..fallback
        };
    }

    let min_distance = max_dim * options.min_distance_factor;
    let max_distance = max_dim * options.max_distance_factor;

    let half_fov = (options.fov_deg.to_radians() * 0.5).max(1e-3);
    let fit_height = max_dim / (2.0 * half_fov.tan());
    let fit_width = fit_height / options.aspect_ratio.max(1e-3);
    let distance = (fit_height.max(fit_width) * options.fit_margin)
        .max(min_distance)
        .min(max_distance);

    Framing {
        position: center + view_direction(options) * distance,
        target: center,
        min_distance,
        max_distance,
    }
}

/// The hardcoded pose used when geometry never becomes available.
#[must_use]
pub fn fallback_framing(options: &FramingOptions) -> Framing {
    Framing {
        position: options.fallback_position,
        target: options.fallback_target,
        min_distance: options.fallback_min_distance,
        max_distance: options.fallback_max_distance,
    }
}

/// Outcome of one framing attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramingStatus {
    /// Geometry not available yet; try again next frame.
    Pending,
    /// Framed from real geometry.
    Framed(Framing),
    /// Budget exhausted; using the fallback pose.
    FellBack(Framing),
}

impl FramingStatus {
    /// The framing, if one was produced.
    #[must_use]
    pub fn framing(&self) -> Option<Framing> {
        match self {
            FramingStatus::Pending => None,
            FramingStatus::Framed(f) | FramingStatus::FellBack(f) => Some(*f),
        }
    }
}

/// Retries framing once per frame until geometry appears or the budget runs out.
#[derive(Debug, Clone)]
pub struct Framer {
    options: FramingOptions,
    frames_waited: u32,
    active: bool,
}

impl Framer {
    /// Creates an active framer.
    #[must_use]
    pub fn new(options: FramingOptions) -> Self {
        Self {
            options,
            frames_waited: 0,
            active: true,
        }
    }

    /// Creates a framer that has nothing to do until [`restart`](Self::restart).
    #[must_use]
    pub fn idle(options: FramingOptions) -> Self {
        Self {
            active: false,
            ..Self::new(options)
        }
    }

    /// Whether the framer is still waiting for geometry.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.active
    }

    /// Frames spent waiting so far.
    #[must_use]
    pub fn frames_waited(&self) -> u32 {
        self.frames_waited
    }

    /// Starts a new framing attempt with a fresh budget.
    pub fn restart(&mut self) {
        self.frames_waited = 0;
        self.active = true;
    }

    /// Stops waiting without producing a framing.
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Attempts framing for this frame.
    ///
    /// An idle framer always returns `Pending`. Any other result puts the
    /// framer into the idle state.
    pub fn tick(&mut self, bounds: Option<Aabb>) -> FramingStatus {
        if !self.active {
            return FramingStatus::Pending;
        }
        if let Some(bounds) = bounds {
            self.active = false;
            let framing = frame_bounds(&bounds, &self.options);
            log::debug!(
                "framed assembly after {} frames: distance {:.3} in [{:.3}, {:.3}]",
                self.frames_waited,
                framing.distance(),
                framing.min_distance,
                framing.max_distance
            );
            return FramingStatus::Framed(framing);
        }
        self.frames_waited += 1;
        if self.frames_waited >= self.options.frame_budget {
            self.active = false;
            log::warn!(
                "geometry not available after {} frames, using default camera pose",
                self.frames_waited
            );
            return FramingStatus::FellBack(fallback_framing(&self.options));
        }
        FramingStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_distance_bounds_from_max_dimension() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(4.0, 1.0, 2.0));
        let framing = frame_bounds(&bounds, &FramingOptions::default());
        assert!((framing.min_distance - 1.2).abs() < 1e-6);
        assert!((framing.max_distance - 24.0).abs() < 1e-5);
        assert_eq!(framing.target, Vec3::new(2.0, 0.5, 1.0));
        let d = framing.distance();
        assert!(d >= framing.min_distance - 1e-4 && d <= framing.max_distance + 1e-4);
    }

    #[test]
    fn test_fit_distance_contains_box() {
        let options = FramingOptions {
            aspect_ratio: 1.0,
            ..FramingOptions::default()
        };
        let framing = frame_bounds(&unit_box(), &options);
        let half_fov = options.fov_deg.to_radians() * 0.5;
        let exact = 2.0 / (2.0 * half_fov.tan());
        assert!((framing.distance() - exact * 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_three_quarter_view() {
        let framing = frame_bounds(&unit_box(), &FramingOptions::default());
        let dir = (framing.position - framing.target).normalize();
        // 30 degrees elevation, 45 degrees azimuth
        assert!((dir.y - 0.5).abs() < 1e-5);
        assert!((dir.x - dir.z).abs() < 1e-5);
        assert!(dir.x > 0.0);
    }

    #[test]
    fn test_distance_clamped_to_max() {
        let options = FramingOptions {
            fit_margin: 1000.0,
            ..FramingOptions::default()
        };
        let framing = frame_bounds(&unit_box(), &options);
        assert!((framing.distance() - framing.max_distance).abs() < 1e-3);
    }

    #[test]
    fn test_reversed_distance_factors_do_not_panic() {
        let options = FramingOptions {
            min_distance_factor: 8.0,
            ..FramingOptions::default()
        };
        let framing = frame_bounds(&unit_box(), &options);
        assert!(framing.distance().is_finite());
        assert!((framing.distance() - framing.max_distance).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_box_uses_fallback_distances() {
        let options = FramingOptions::default();
        let framing = frame_bounds(&Aabb::from_point(Vec3::new(1.0, 2.0, 3.0)), &options);
        assert_eq!(framing.target, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(framing.min_distance, options.fallback_min_distance);
        assert_eq!(framing.max_distance, options.fallback_max_distance);
    }

    #[test]
    fn test_framer_defers_then_frames() {
        let mut framer = Framer::new(FramingOptions::default());
        assert_eq!(framer.tick(None), FramingStatus::Pending);
        assert_eq!(framer.tick(None), FramingStatus::Pending);
        assert_eq!(framer.frames_waited(), 2);
        let status = framer.tick(Some(unit_box()));
        assert!(matches!(status, FramingStatus::Framed(_)));
        assert!(!framer.is_pending());
        assert_eq!(framer.tick(Some(unit_box())), FramingStatus::Pending);
    }

    #[test]
    fn test_framer_falls_back_after_budget() {
        let options = FramingOptions {
            frame_budget: 3,
            ..FramingOptions::default()
        };
        let mut framer = Framer::new(options.clone());
        assert_eq!(framer.tick(None), FramingStatus::Pending);
        assert_eq!(framer.tick(None), FramingStatus::Pending);
        assert_eq!(
            framer.tick(None),
            FramingStatus::FellBack(fallback_framing(&options))
        );
        assert!(!framer.is_pending());

        framer.restart();
        assert!(framer.is_pending());
        assert_eq!(framer.frames_waited(), 0);
    }
}

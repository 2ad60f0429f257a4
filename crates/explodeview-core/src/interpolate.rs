//! Frame-rate independent smoothing of live transforms toward targets.

use crate::transform::Transform;

/// Default damping constant (per second).
pub const DEFAULT_DAMPING: f32 = 5.0;

/// Advances `live` toward `target` by exponential decay over `dt` seconds.
///
/// The step fraction is `damping * dt`, capped at 1 so large frame gaps snap
/// to the target instead of overshooting. Non-positive or non-finite `dt`
/// leaves `live` unchanged.
#[must_use]
pub fn advance(live: &Transform, target: &Transform, dt: f32, damping: f32) -> Transform {
    if !(dt.is_finite() && dt > 0.0) {
        return *live;
    }
    let t = (damping.max(0.0) * dt).min(1.0);
    if t >= 1.0 {
        return *target;
    }
    Transform {
        translation: live.translation.lerp(target.translation, t),
        rotation: live.rotation.slerp(target.rotation, t),
        scale: live.scale.lerp(target.scale, t),
    }
}

/// Live per-node transforms chasing their targets.
#[derive(Debug, Clone)]
pub struct TransformInterpolator {
    live: Vec<Transform>,
    damping: f32,
}

impl TransformInterpolator {
    /// Creates an interpolator whose live transforms start at `initial`.
    #[must_use]
    pub fn new(initial: &[Transform], damping: f32) -> Self {
        Self {
            live: initial.to_vec(),
            damping,
        }
    }

    /// The damping constant.
    #[must_use]
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Sets the damping constant.
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.max(0.0);
    }

    /// Live transforms, indexed like the targets they chase.
    #[must_use]
    pub fn live(&self) -> &[Transform] {
        &self.live
    }

    /// Advances every live transform toward its target.
    pub fn tick(&mut self, targets: &[Transform], dt: f32) {
        debug_assert_eq!(targets.len(), self.live.len());
        for (live, target) in self.live.iter_mut().zip(targets) {
            *live = advance(live, target, dt, self.damping);
        }
    }

    /// Jumps every live transform to its target.
    pub fn snap_to(&mut self, targets: &[Transform]) {
        self.live.clear();
        self.live.extend_from_slice(targets);
    }

    /// Drops all live state.
    pub fn reset(&mut self) {
        self.live.clear();
    }

    /// Largest per-node distance between live and target transforms.
    #[must_use]
    pub fn max_distance_to(&self, targets: &[Transform]) -> f32 {
        self.live
            .iter()
            .zip(targets)
            .map(|(l, t)| l.distance(t))
            .fold(0.0, f32::max)
    }

    /// Whether every live transform is within `epsilon` of its target.
    ///
    /// Advisory only: ticking continues regardless.
    #[must_use]
    pub fn is_settled(&self, targets: &[Transform], epsilon: f32) -> bool {
        self.max_distance_to(targets) <= epsilon
    }
}

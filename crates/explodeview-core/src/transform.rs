//! Node transforms represented as separate translation/rotation/scale components.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A transformation represented as separate components.
///
/// Keeping the components apart (instead of a `Mat4`) lets the explode driver
/// offset only the translation and lets the interpolator slerp the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Creates a transform from all three components.
    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Creates a transform from a translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform from a rotation.
    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform from a Mat4.
    ///
    /// This decomposition may not be exact for matrices with shear.
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Converts this transform to a Mat4.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Composes `child` (expressed in this transform's local frame) into this frame.
    ///
    /// Matches `self.to_matrix() * child.to_matrix()` for uniform scale.
    #[must_use]
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * (self.scale * child.translation),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    /// Maps a point from this transform's local frame into the parent frame.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }

    /// Returns whether every component is finite and the rotation is non-degenerate.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.rotation.length_squared() > 0.0
    }

    /// Rough distance between two transforms used for convergence checks.
    ///
    /// Sums translation distance, scale distance and the quaternion chord
    /// length (which treats `q` and `-q` as the same rotation).
    #[must_use]
    pub fn distance(&self, other: &Transform) -> f32 {
        let chord = (self.rotation - other.rotation)
            .length()
            .min((self.rotation + other.rotation).length());
        self.translation.distance(other.translation) + self.scale.distance(other.scale) + chord
    }

    /// Translates the transform.
    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    /// Rotates the transform.
    pub fn rotate(&mut self, delta: Quat) {
        self.rotation = delta * self.rotation;
    }
}

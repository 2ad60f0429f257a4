//! Orbit camera driven by user interaction.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::framing::Framing;
use crate::zoom::{distance_from_zoom_percent, zoom_percent_from_distance};

/// Direction of the held auto-rotate button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    /// Orbit to the left (counter-clockwise seen from above).
    Left,
    /// Orbit to the right.
    Right,
    /// Tilt up.
    Up,
    /// Tilt down.
    Down,
}

/// Persisted camera pose for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Zoom as a 0-100 percentage of the allowed distance range.
    pub zoom: f32,
}

/// A 3D orbit camera for viewing an assembly.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Closest allowed orbit distance.
    pub min_distance: f32,
    /// Farthest allowed orbit distance.
    pub max_distance: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 50f32.to_radians(),
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            min_distance: 0.1,
            max_distance: 100.0,
        }
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// Returns the camera's right direction.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    /// Distance from the camera to its target.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Moves the camera along its view ray to `distance`, clamped to the orbit bounds.
    pub fn set_distance(&mut self, distance: f32) {
        let distance = distance.max(self.min_distance).min(self.max_distance);
        let direction = self.forward();
        self.position = self.target - direction * distance;
    }

    /// Orbits the camera around the target (turntable style).
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let radius = self.distance();
        if radius <= f32::EPSILON {
            return;
        }
        let mut theta = (self.position.x - self.target.x).atan2(self.position.z - self.target.z);
        let mut phi = ((self.position.y - self.target.y) / radius)
            .clamp(-1.0, 1.0)
            .acos();

        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Pans the camera.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let right = self.right();
        let up = self.up;
        let offset = right * delta_x + up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Zooms the camera toward (positive `delta`) or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        self.set_distance(self.distance() - delta);
    }

    /// Rotates the camera for a held rotate button over `dt` seconds.
    pub fn auto_rotate(&mut self, direction: RotateDirection, speed: f32, dt: f32) {
        let step = speed * dt;
        match direction {
            RotateDirection::Left => self.orbit(-step, 0.0),
            RotateDirection::Right => self.orbit(step, 0.0),
            RotateDirection::Up => self.orbit(0.0, step),
            RotateDirection::Down => self.orbit(0.0, -step),
        }
    }

    /// Rotates the camera position about the target by an arbitrary rotation.
    pub fn rotate_about_target(&mut self, rotation: Quat) {
        self.position = self.target + rotation * (self.position - self.target);
    }

    /// Zoom as a 0-100 percentage of the orbit bounds.
    #[must_use]
    pub fn zoom_percent(&self) -> f32 {
        zoom_percent_from_distance(self.distance(), self.min_distance, self.max_distance)
    }

    /// Sets the zoom from a 0-100 percentage of the orbit bounds.
    pub fn set_zoom_percent(&mut self, percent: f32) {
        self.set_distance(distance_from_zoom_percent(
            percent,
            self.min_distance,
            self.max_distance,
        ));
    }

    /// Adopts a framing's pose and orbit bounds.
    pub fn apply_framing(&mut self, framing: &Framing) {
        self.position = framing.position;
        self.target = framing.target;
        self.min_distance = framing.min_distance;
        self.max_distance = framing.max_distance;
        self.near = (framing.min_distance * 0.01).max(0.001);
        self.far = (framing.max_distance * 10.0).max(self.near + 0.1);
    }

    /// Snapshot of the pose for persistence.
    #[must_use]
    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.position,
            target: self.target,
            zoom: self.zoom_percent(),
        }
    }

    /// Restores a persisted pose. Returns false if the state is unusable.
    pub fn restore(&mut self, state: &CameraState) -> bool {
        if !(state.position.is_finite() && state.target.is_finite())
            || state.position.distance(state.target) <= f32::EPSILON
        {
            return false;
        }
        self.position = state.position;
        self.target = state.target;
        // Re-clamp in case the bounds changed since the state was stored.
        self.set_distance(self.distance());
        true
    }

    /// Sets the field of view in radians.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.1, std::f32::consts::PI - 0.1);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

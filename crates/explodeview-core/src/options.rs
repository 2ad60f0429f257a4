//! Configuration options for explodeview.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Global configuration options for a viewer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Exponential damping constant for live transforms (per second).
    pub damping: f32,

    /// Camera auto-framing configuration.
    pub framing: FramingOptions,

    /// Quiet period before a throttled change is delivered, in milliseconds.
    pub throttle_ms: u64,

    /// Auto-rotation speed while a rotate button is held (radians per second).
    pub rotate_speed: f32,

    /// Directory for persisted view state. `None` uses the platform data dir.
    pub store_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            damping: 5.0,
            framing: FramingOptions::default(),
            throttle_ms: 40,
            rotate_speed: 1.0,
            store_dir: None,
        }
    }
}

impl Options {
    /// Loads options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut options: Self = serde_json::from_str(&text)?;
        options.framing.repair();
        log::debug!("loaded options from {}", path.as_ref().display());
        Ok(options)
    }
}

/// Parameters for framing the camera around an assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingOptions {
    /// Minimum orbit distance as a multiple of the largest box dimension.
    pub min_distance_factor: f32,
    /// Maximum orbit distance as a multiple of the largest box dimension.
    pub max_distance_factor: f32,
    /// Multiplier applied to the exact fit distance.
    pub fit_margin: f32,
    /// Camera elevation above the horizontal plane, in degrees.
    pub elevation_deg: f32,
    /// Camera azimuth around the vertical axis, in degrees.
    pub azimuth_deg: f32,
    /// Vertical field of view, in degrees.
    pub fov_deg: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Frames to wait for geometry before using the fallback pose.
    pub frame_budget: u32,
    /// Fallback camera position.
    pub fallback_position: Vec3,
    /// Fallback look-at target.
    pub fallback_target: Vec3,
    /// Fallback minimum orbit distance.
    pub fallback_min_distance: f32,
    /// Fallback maximum orbit distance.
    pub fallback_max_distance: f32,
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self {
            min_distance_factor: 0.3,
            max_distance_factor: 6.0,
            fit_margin: 1.5,
            elevation_deg: 30.0,
            azimuth_deg: 45.0,
            fov_deg: 50.0,
            aspect_ratio: 16.0 / 9.0,
            frame_budget: 120,
            fallback_position: Vec3::new(3.0, 3.0, 3.0),
            fallback_target: Vec3::ZERO,
            fallback_min_distance: 0.5,
            fallback_max_distance: 30.0,
        }
    }
}

impl FramingOptions {
    /// Fixes values that would make framing ill-defined.
    ///
    /// Non-finite or negative distances fall back to their defaults and a
    /// reversed min/max pair is swapped. Returns whether anything changed.
    pub fn repair(&mut self) -> bool {
        let defaults = Self::default();
        let mut changed = false;
        for (value, default, name) in [
            (&mut self.min_distance_factor, defaults.min_distance_factor, "min_distance_factor"),
            (&mut self.max_distance_factor, defaults.max_distance_factor, "max_distance_factor"),
            (&mut self.fallback_min_distance, defaults.fallback_min_distance, "fallback_min_distance"),
            (&mut self.fallback_max_distance, defaults.fallback_max_distance, "fallback_max_distance"),
            (&mut self.fit_margin, defaults.fit_margin, "fit_margin"),
        ] {
            if !(value.is_finite() && *value >= 0.0) {
                log::warn!("framing option {name} = {value} is invalid, using {default}");
                *value = default;
                changed = true;
            }
        }
        if self.min_distance_factor > self.max_distance_factor {
            log::warn!(
                "min_distance_factor {} exceeds max_distance_factor {}, swapping",
                self.min_distance_factor,
                self.max_distance_factor
            );
            std::mem::swap(&mut self.min_distance_factor, &mut self.max_distance_factor);
            changed = true;
        }
        if self.fallback_min_distance > self.fallback_max_distance {
            log::warn!(
                "fallback_min_distance {} exceeds fallback_max_distance {}, swapping",
                self.fallback_min_distance,
                self.fallback_max_distance
            );
            std::mem::swap(&mut self.fallback_min_distance, &mut self.fallback_max_distance);
            changed = true;
        }
        changed
    }
}
